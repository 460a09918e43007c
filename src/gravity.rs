//! Gravity and refill: compact each column downward, then top it up with new orbs.

use crate::grid::{Board, Cell, EnhancedSet, Grid, OrbSource, PendingEnhanced, Pos, COLS, ROWS};
use std::collections::HashMap;

/// How far each orb travelled in one gravity pass, keyed by where it ended up.
/// Only consumed by rendering; unmoved orbs read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallDistances(HashMap<Pos, usize>);

impl FallDistances {
    #[cfg(test)]
    pub fn get(&self, pos: Pos) -> usize {
        self.0.get(&pos).copied().unwrap_or(0)
    }

    fn set(&mut self, pos: Pos, distance: usize) {
        if distance > 0 {
            self.0.insert(pos, distance);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pos, usize)> + '_ {
        self.0.iter().map(|(&p, &d)| (p, d))
    }

    pub fn max(&self) -> usize {
        self.0.values().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Plain gravity: compaction plus random refill. Enhanced flags are not touched.
pub fn apply_gravity(grid: &mut Grid, orbs: &mut impl OrbSource) -> FallDistances {
    settle(grid, None, &[], orbs)
}

/// Gravity that keeps enhanced flags attached to their orbs and seeds pending enhanced
/// orbs into the topmost vacated cells of their columns. `board.pending` is drained.
pub fn apply_gravity_with_enhanced(board: &mut Board, orbs: &mut impl OrbSource) -> FallDistances {
    let pending = std::mem::take(&mut board.pending);
    settle(&mut board.grid, Some(&mut board.enhanced), &pending, orbs)
}

fn settle(
    grid: &mut Grid,
    mut enhanced: Option<&mut EnhancedSet>,
    pending: &[PendingEnhanced],
    orbs: &mut impl OrbSource,
) -> FallDistances {
    let before = enhanced.as_deref().copied();
    if let Some(e) = enhanced.as_deref_mut() {
        e.clear();
    }
    let mut falls = FallDistances::default();

    for col in 0..COLS {
        // Bottom-up compaction; `vacated` counts the empty cells left on top.
        let mut write = ROWS;
        for row in (0..ROWS).rev() {
            let cell = grid.get(Pos::new(row, col));
            if cell.is_empty() {
                continue;
            }
            write -= 1;
            let (from, to) = (Pos::new(row, col), Pos::new(write, col));
            if write != row {
                grid.set(to, cell);
                grid.set(from, Cell::Empty);
                falls.set(to, write - row);
            }
            if let (Some(e), Some(old)) = (enhanced.as_deref_mut(), before.as_ref()) {
                if old.contains(from) {
                    e.insert(to);
                }
            }
        }
        let vacated = write;

        let mut seeds = pending.iter().filter(|p| p.col == col);
        for row in 0..vacated {
            let pos = Pos::new(row, col);
            match (seeds.next(), enhanced.as_deref_mut()) {
                (Some(seed), Some(e)) => {
                    grid.set(pos, Cell::Orb(seed.orb));
                    e.insert(pos);
                }
                _ => grid.set(pos, Cell::Orb(orbs.next_orb())),
            }
            // New orbs enter from above the board, so they drop further than anything
            // already in the column.
            falls.set(pos, ROWS - row);
        }
    }
    falls
}
