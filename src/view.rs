//! Render-side copy of the game, rebuilt purely from engine events.

use crate::drag::{Trail, TrailMark};
use crate::event::Event;
use crate::grid::{EnhancedSet, Grid, Orb, Pos};
use crate::scheduler::Millis;

/// The group currently held on screen before removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub cells: Vec<Pos>,
    pub orb: Orb,
    pub big: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BoardView {
    pub grid: Grid,
    pub enhanced: EnhancedSet,
    pub path: Vec<Pos>,
    pub held: Option<Pos>,
    trail: Trail,
    pub highlight: Option<Highlight>,
    /// Running combo of the cascade in progress; 0 when idle.
    pub combo: usize,
    pub score: u64,
    pub last_combo: usize,
    /// Orbs cleared by the last finished resolution.
    pub last_removed: usize,
    pub remaining_ms: Millis,
    pub drag_limit_ms: Millis,
}

impl BoardView {
    pub fn new(drag_limit_ms: Millis) -> Self {
        Self {
            remaining_ms: drag_limit_ms,
            drag_limit_ms,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::BoardChanged { grid, enhanced } => {
                self.grid = *grid;
                self.enhanced = *enhanced;
                // A board change right after a match is the group being removed.
                self.highlight = None;
            }
            Event::DragPathChanged { path, held, trail } => {
                self.path.clone_from(path);
                self.held = *held;
                self.trail.replace(trail.clone());
            }
            Event::GroupMatched {
                cells,
                orb,
                combo,
                big,
                ..
            } => {
                self.highlight = Some(Highlight {
                    cells: cells.clone(),
                    orb: *orb,
                    big: *big,
                });
                self.combo = *combo;
            }
            Event::Settled { .. } => {}
            Event::ResolutionComplete {
                removed,
                combos,
                score,
            } => {
                self.score = *score;
                self.last_removed = *removed;
                self.last_combo = *combos;
                self.combo = 0;
                self.highlight = None;
            }
            Event::ScoreChanged { score, last_combo } => {
                self.score = *score;
                self.last_combo = *last_combo;
            }
            Event::TimerTick { remaining_ms } => self.remaining_ms = *remaining_ms,
        }
    }

    pub fn highlight_at(&self, pos: Pos) -> Option<&Highlight> {
        self.highlight.as_ref().filter(|h| h.cells.contains(&pos))
    }

    pub fn on_path(&self, pos: Pos) -> bool {
        self.path.contains(&pos)
    }

    /// Trail marks still alive at engine time `now`.
    pub fn trail(&mut self, now: Millis) -> &[TrailMark] {
        self.trail.active(now)
    }

    /// Fraction of the drag time left, 0.0..=1.0.
    pub fn time_ratio(&self) -> f64 {
        if self.drag_limit_ms == 0 {
            return 0.0;
        }
        (self.remaining_ms as f64 / self.drag_limit_ms as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gravity::FallDistances;

    #[test]
    fn match_highlight_lasts_until_removal() {
        let mut view = BoardView::new(5_500);
        let cells = vec![Pos::new(0, 0), Pos::new(0, 1), Pos::new(0, 2)];
        view.apply(&Event::GroupMatched {
            cells,
            orb: Orb::Red,
            combo: 2,
            big: false,
            hold_ms: 180,
        });
        assert!(view.highlight_at(Pos::new(0, 1)).is_some_and(|h| !h.big));
        assert!(view.highlight_at(Pos::new(1, 1)).is_none());
        assert_eq!(view.combo, 2);

        view.apply(&Event::BoardChanged {
            grid: Grid::empty(),
            enhanced: EnhancedSet::default(),
        });
        assert!(view.highlight.is_none());
        view.apply(&Event::Settled {
            falls: FallDistances::default(),
            fall_ms: 500,
        });
        assert_eq!(view.combo, 2);

        view.apply(&Event::ResolutionComplete {
            removed: 3,
            combos: 2,
            score: 230,
        });
        assert_eq!(view.combo, 0);
        assert_eq!(view.score, 230);
        assert_eq!((view.last_removed, view.last_combo), (3, 2));
    }

    #[test]
    fn path_and_trail_follow_the_drag() {
        let mut view = BoardView::new(5_500);
        view.apply(&Event::DragPathChanged {
            path: vec![Pos::new(1, 1), Pos::new(1, 2)],
            held: Some(Pos::new(1, 2)),
            trail: vec![TrailMark {
                pos: Pos::new(1, 1),
                until: 220,
            }],
        });
        assert!(view.on_path(Pos::new(1, 1)));
        assert_eq!(view.held, Some(Pos::new(1, 2)));
        assert_eq!(view.trail(100).len(), 1);
        assert!(view.trail(220).is_empty());
    }

    #[test]
    fn timer_ratio() {
        let mut view = BoardView::new(5_000);
        assert!((view.time_ratio() - 1.0).abs() < f64::EPSILON);
        view.apply(&Event::TimerTick { remaining_ms: 1_250 });
        assert!((view.time_ratio() - 0.25).abs() < f64::EPSILON);
        assert!(view.drag_limit_ms > 0);
    }
}
