//! Messages in and out of the engine. The renderer only ever sees the board through these.

use crate::drag::TrailMark;
use crate::gravity::FallDistances;
use crate::grid::{EnhancedSet, Grid, Orb, Pos};
use crate::scheduler::Millis;

/// What the front end asks of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Reset,
    DragStart(Pos),
    DragMove(Pos),
    DragRelease,
    /// Advance the engine clock to this time, running everything due.
    Tick(Millis),
}

/// What the engine reports back, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BoardChanged {
        grid: Grid,
        enhanced: EnhancedSet,
    },
    DragPathChanged {
        path: Vec<Pos>,
        held: Option<Pos>,
        trail: Vec<TrailMark>,
    },
    GroupMatched {
        cells: Vec<Pos>,
        orb: Orb,
        /// Running combo number within the current cascade, starting at 1.
        combo: usize,
        big: bool,
        /// How long the engine holds before the group is removed.
        hold_ms: Millis,
    },
    Settled {
        falls: FallDistances,
        fall_ms: Millis,
    },
    ResolutionComplete {
        removed: usize,
        combos: usize,
        score: u64,
    },
    ScoreChanged {
        score: u64,
        last_combo: usize,
    },
    TimerTick {
        remaining_ms: Millis,
    },
}
