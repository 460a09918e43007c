//! Drag session state and the short-lived trail of recently visited cells.

use crate::grid::{Cell, Pos};
use crate::scheduler::{Millis, TaskId};

/// Timer period while a drag is running: 50 ms is 20 ticks per second.
pub const DRAG_TICK_MS: Millis = 50;
/// How long a visited cell stays highlighted in the trail.
pub const TRAIL_MS: Millis = 220;

/// One drag, from press to release. Dropped on release.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub origin: Pos,
    pub current: Pos,
    /// The orb being carried; stays fixed while it is swapped along the path.
    pub carried: Cell,
    path: Vec<Pos>,
    /// Set by the first successful move; the time limit counts from here.
    pub started_at: Option<Millis>,
    pub timer: Option<TaskId>,
}

impl DragSession {
    pub fn new(origin: Pos, carried: Cell) -> Self {
        Self {
            origin,
            current: origin,
            carried,
            path: vec![origin],
            started_at: None,
            timer: None,
        }
    }

    /// A move is taken only if it targets a different cell that touches the current one,
    /// diagonals included.
    pub fn accepts(&self, target: Pos) -> bool {
        self.current.is_adjacent8(target)
    }

    pub fn visit(&mut self, pos: Pos) {
        self.current = pos;
        if !self.path.contains(&pos) {
            self.path.push(pos);
        }
    }

    /// Visited cells, in first-visit order.
    pub fn path(&self) -> &[Pos] {
        &self.path
    }

    pub fn elapsed(&self, now: Millis) -> Millis {
        self.started_at.map_or(0, |t| now.saturating_sub(t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailMark {
    pub pos: Pos,
    pub until: Millis,
}

/// Recently visited cells. Expired marks are dropped whenever the trail is read.
#[derive(Debug, Clone, Default)]
pub struct Trail {
    marks: Vec<TrailMark>,
}

impl Trail {
    pub fn push(&mut self, pos: Pos, now: Millis) {
        self.marks.push(TrailMark {
            pos,
            until: now + TRAIL_MS,
        });
    }

    pub fn replace(&mut self, marks: Vec<TrailMark>) {
        self.marks = marks;
    }

    pub fn active(&mut self, now: Millis) -> &[TrailMark] {
        self.marks.retain(|m| m.until > now);
        &self.marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Orb;

    #[test]
    fn path_records_each_cell_once() {
        let mut s = DragSession::new(Pos::new(2, 2), Cell::Orb(Orb::Red));
        s.visit(Pos::new(2, 3));
        s.visit(Pos::new(2, 2));
        s.visit(Pos::new(3, 3));
        assert_eq!(s.path(), &[Pos::new(2, 2), Pos::new(2, 3), Pos::new(3, 3)]);
        assert_eq!(s.current, Pos::new(3, 3));
        assert_eq!(s.origin, Pos::new(2, 2));
    }

    #[test]
    fn only_adjacent_cells_are_accepted() {
        let s = DragSession::new(Pos::new(2, 2), Cell::Orb(Orb::Red));
        assert!(s.accepts(Pos::new(1, 3)));
        assert!(!s.accepts(Pos::new(2, 2)));
        assert!(!s.accepts(Pos::new(2, 4)));
    }

    #[test]
    fn elapsed_counts_from_first_move() {
        let mut s = DragSession::new(Pos::new(0, 0), Cell::Empty);
        assert_eq!(s.elapsed(900), 0);
        s.started_at = Some(100);
        assert_eq!(s.elapsed(350), 250);
    }

    #[test]
    fn trail_expires_lazily() {
        let mut t = Trail::default();
        t.push(Pos::new(0, 0), 0);
        t.push(Pos::new(0, 1), 100);
        assert_eq!(t.active(219).len(), 2);
        assert_eq!(t.active(220), &[TrailMark { pos: Pos::new(0, 1), until: 320 }]);
        assert!(t.active(400).is_empty());
    }
}
