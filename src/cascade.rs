//! Cascade sequencing: detect, remove group by group, drop, repeat until the board is quiet.
//!
//! The sequencer is a plain state machine. Each call to [`Cascade::step`] runs one phase and
//! says how long to wait before the next; the caller owns the clock. [`resolve_all`] is the
//! unpaced bulk version used when only the end state matters.

use crate::event::Event;
use crate::gravity::{apply_gravity, apply_gravity_with_enhanced};
use crate::grid::{Board, Cell, Grid, OrbSource, PendingEnhanced};
use crate::matcher::{Group, find_matches, group_by_color};
use crate::scheduler::Millis;

pub const SCORE_PER_ORB: u64 = 10;
pub const SCORE_PER_COMBO: u64 = 100;

/// Hold times between phases, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub group_ms: Millis,
    pub big_group_ms: Millis,
    pub before_gravity_ms: Millis,
    pub fall_ms: Millis,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            group_ms: 180,
            big_group_ms: 280,
            before_gravity_ms: 80,
            fall_ms: 500,
        }
    }
}

impl Pacing {
    /// No holds at all. The cascade still runs phase by phase, just without waiting.
    pub const fn instant() -> Self {
        Self {
            group_ms: 0,
            big_group_ms: 0,
            before_gravity_ms: 0,
            fall_ms: 0,
        }
    }

    pub fn hold(&self, group: &Group) -> Millis {
        if group.is_big() {
            self.big_group_ms
        } else {
            self.group_ms
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    GroupDetecting,
    GroupRemoving,
    Gravity,
    Settling,
}

/// Totals for one finished resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    pub removed: usize,
    pub combos: usize,
}

impl Resolution {
    pub fn score(&self) -> u64 {
        self.removed as u64 * SCORE_PER_ORB + self.combos as u64 * SCORE_PER_COMBO
    }
}

/// Result of running one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Call `step` again after this many milliseconds.
    Wait(Millis),
    /// Back to idle; the board is quiet.
    Done(Resolution),
}

#[derive(Debug, Clone, Default)]
pub struct Cascade {
    phase: Phase,
    pacing: Pacing,
    groups: Vec<Group>,
    current: usize,
    removed: usize,
    /// Groups removed so far this cascade. This is what scores, not the detector's
    /// colour-agnostic combo count.
    combos: usize,
}

impl Cascade {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Begin a new cascade. The first `step` runs detection.
    pub fn start(&mut self) {
        debug_assert!(!self.is_active(), "cascade started twice");
        *self = Self::new(self.pacing);
        self.phase = Phase::GroupDetecting;
    }

    pub fn step(
        &mut self,
        board: &mut Board,
        orbs: &mut impl OrbSource,
        events: &mut Vec<Event>,
    ) -> Step {
        match self.phase {
            Phase::Idle => Step::Done(Resolution::default()),
            Phase::GroupDetecting => self.detect(board, events),
            Phase::GroupRemoving => {
                self.commit_current(board, events);
                self.current += 1;
                if self.current < self.groups.len() {
                    Step::Wait(self.announce_current(events))
                } else {
                    log::debug!("round done, {} groups so far", self.combos);
                    self.phase = Phase::Gravity;
                    Step::Wait(self.pacing.before_gravity_ms)
                }
            }
            Phase::Gravity => {
                let falls = apply_gravity_with_enhanced(board, orbs);
                log::debug!("gravity applied, longest fall {}", falls.max());
                events.push(Event::Settled {
                    falls,
                    fall_ms: self.pacing.fall_ms,
                });
                events.push(board_changed(board));
                self.phase = Phase::Settling;
                Step::Wait(self.pacing.fall_ms)
            }
            Phase::Settling => {
                self.phase = Phase::GroupDetecting;
                self.detect(board, events)
            }
        }
    }

    fn detect(&mut self, board: &Board, events: &mut Vec<Event>) -> Step {
        let report = find_matches(&board.grid);
        if report.marks.is_empty() {
            let resolution = Resolution {
                removed: self.removed,
                combos: self.combos,
            };
            *self = Self::new(self.pacing);
            return Step::Done(resolution);
        }
        self.groups = group_by_color(&board.grid, &report.marks);
        self.current = 0;
        self.phase = Phase::GroupRemoving;
        log::debug!(
            "detected {} marked cells in {} groups ({} regions)",
            report.marks.count(),
            self.groups.len(),
            report.combos
        );
        Step::Wait(self.announce_current(events))
    }

    fn announce_current(&self, events: &mut Vec<Event>) -> Millis {
        let group = &self.groups[self.current];
        let hold_ms = self.pacing.hold(group);
        events.push(Event::GroupMatched {
            cells: group.cells.clone(),
            orb: group.orb,
            combo: self.combos + 1,
            big: group.is_big(),
            hold_ms,
        });
        hold_ms
    }

    fn commit_current(&mut self, board: &mut Board, events: &mut Vec<Event>) {
        let group = &self.groups[self.current];
        if group.is_big() {
            if let Some(lowest) = group.lowest() {
                log::debug!("big match of {} {}", group.len(), group.orb.name());
                board.pending.push(PendingEnhanced {
                    col: lowest.col,
                    orb: group.orb,
                });
            }
        }
        for &pos in &group.cells {
            if !board.grid.get(pos).is_empty() {
                board.grid.set(pos, Cell::Empty);
                board.enhanced.remove(pos);
                self.removed += 1;
            }
        }
        self.combos += 1;
        events.push(board_changed(board));
    }
}

pub fn board_changed(board: &Board) -> Event {
    Event::BoardChanged {
        grid: board.grid,
        enhanced: board.enhanced,
    }
}

/// Resolve every match at once with no pacing and no events.
///
/// Each pass removes all marked cells, applies plain gravity and adds the detector's
/// region count to the combo total.
pub fn resolve_all(grid: &mut Grid, orbs: &mut impl OrbSource) -> Resolution {
    let mut total = Resolution::default();
    loop {
        let report = find_matches(grid);
        if report.marks.is_empty() {
            return total;
        }
        for pos in report.marks.positions() {
            grid.set(pos, Cell::Empty);
            total.removed += 1;
        }
        total.combos += report.combos;
        apply_gravity(grid, orbs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Orb, Pos, RandomOrbs, ScriptedOrbs};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn board(s: &str) -> Board {
        Board {
            grid: s.parse().unwrap(),
            ..Board::default()
        }
    }

    /// Run the cascade to completion, collecting events and the waits between phases.
    fn run(
        cascade: &mut Cascade,
        board: &mut Board,
        orbs: &mut impl OrbSource,
    ) -> (Resolution, Vec<Event>, Vec<Millis>) {
        let mut events = Vec::new();
        let mut waits = Vec::new();
        cascade.start();
        for _ in 0..1_000 {
            match cascade.step(board, orbs, &mut events) {
                Step::Wait(ms) => waits.push(ms),
                Step::Done(res) => return (res, events, waits),
            }
        }
        panic!("cascade did not finish");
    }

    #[test]
    fn single_round_scores_removed_and_groups() {
        let mut b = board("RRRYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB");
        // Refill restores the quiet pattern, so nothing cascades.
        let mut orbs = ScriptedOrbs::new("RBG");
        let mut cascade = Cascade::new(Pacing::default());
        let (res, events, waits) = run(&mut cascade, &mut b, &mut orbs);

        assert_eq!(res, Resolution { removed: 3, combos: 1 });
        assert_eq!(res.score(), 3 * 10 + 100);
        assert_eq!(waits, vec![180, 80, 500]);
        assert!(!cascade.is_active());
        assert!(find_matches(&b.grid).marks.is_empty());
        assert!(matches!(
            events.first(),
            Some(Event::GroupMatched { combo: 1, big: false, .. })
        ));
    }

    #[test]
    fn crossing_runs_score_as_two_groups() {
        let mut b = board("RBGYPH\nGYPBRB\nRRRBGY\nRBGBPH\nGYPHRB");
        let mut cascade = Cascade::new(Pacing::instant());
        let mut orbs = RandomOrbs::new(StdRng::seed_from_u64(7), 6);
        let mut events = Vec::new();
        cascade.start();
        // Detection then two group removals.
        assert_eq!(cascade.step(&mut b, &mut orbs, &mut events), Step::Wait(0));
        assert_eq!(cascade.phase(), Phase::GroupRemoving);
        assert_eq!(cascade.step(&mut b, &mut orbs, &mut events), Step::Wait(0));
        assert_eq!(cascade.step(&mut b, &mut orbs, &mut events), Step::Wait(0));
        assert_eq!(cascade.phase(), Phase::Gravity);
        let combos: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                Event::GroupMatched { combo, .. } => Some(*combo),
                _ => None,
            })
            .collect();
        assert_eq!(combos, vec![1, 2]);
        assert_eq!(b.grid.empty_count(), 6);
    }

    #[test]
    fn big_match_spawns_enhanced_orb_in_lowest_column() {
        let mut b = board("RBGYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGGGGGB");
        let mut orbs = ScriptedOrbs::new("BGYP");
        let mut cascade = Cascade::new(Pacing::default());
        let mut events = Vec::new();
        cascade.start();

        assert_eq!(cascade.step(&mut b, &mut orbs, &mut events), Step::Wait(280));
        assert!(matches!(
            events.last(),
            Some(Event::GroupMatched { big: true, orb: Orb::Green, .. })
        ));
        cascade.step(&mut b, &mut orbs, &mut events);
        assert_eq!(b.pending, vec![PendingEnhanced { col: 0, orb: Orb::Green }]);

        assert_eq!(cascade.phase(), Phase::Gravity);
        cascade.step(&mut b, &mut orbs, &mut events);
        assert!(b.pending.is_empty());
        assert_eq!(b.grid.get(Pos::new(0, 0)), Cell::Orb(Orb::Green));
        assert!(b.enhanced.contains(Pos::new(0, 0)));
        assert_eq!(b.enhanced.len(), 1);

        let res = loop {
            if let Step::Done(res) = cascade.step(&mut b, &mut orbs, &mut events) {
                break res;
            }
        };
        assert_eq!(res, Resolution { removed: 5, combos: 1 });
        assert_eq!(res.score(), 150);
        assert!(b.enhanced.contains(Pos::new(0, 0)));
    }

    #[test]
    fn clearing_an_enhanced_orb_drops_its_flag() {
        let mut b = board("RRRYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB");
        b.enhanced.insert(Pos::new(0, 1));
        let mut cascade = Cascade::new(Pacing::instant());
        run(&mut cascade, &mut b, &mut ScriptedOrbs::new("RBG"));
        assert!(b.enhanced.is_empty());
    }

    #[test]
    fn quiet_board_finishes_immediately() {
        let mut b = board("RBGYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB");
        let mut cascade = Cascade::new(Pacing::default());
        let (res, events, waits) = run(&mut cascade, &mut b, &mut ScriptedOrbs::new("R"));
        assert_eq!(res, Resolution::default());
        assert!(events.is_empty());
        assert!(waits.is_empty());
    }

    #[test]
    fn bulk_resolution_counts_detector_regions() {
        let mut grid: Grid = "RBGYPH\nGYPBRB\nRRRBGY\nRBGBPH\nGYPHRB".parse().unwrap();
        let mut orbs = RandomOrbs::new(StdRng::seed_from_u64(3), 6);
        let res = resolve_all(&mut grid, &mut orbs);
        assert!(res.removed >= 6);
        assert!(res.combos >= 1);
        assert!(find_matches(&grid).marks.is_empty());
        assert_eq!(grid.empty_count(), 0);
    }

    #[test]
    fn bulk_resolution_terminates_on_random_boards() {
        for seed in 0..50 {
            let mut orbs = RandomOrbs::new(StdRng::seed_from_u64(seed), 3);
            let mut grid = Grid::empty();
            for pos in Pos::all() {
                grid.set(pos, Cell::Orb(orbs.next_orb()));
            }
            resolve_all(&mut grid, &mut orbs);
            assert!(find_matches(&grid).marks.is_empty(), "seed {seed}");
        }
    }
}
