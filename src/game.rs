//! Game state: board, drag session, cascade and score, driven by intents on a virtual clock.

use crate::GameConfig;
use crate::cascade::{Cascade, Resolution, Step, board_changed, resolve_all};
use crate::drag::{DRAG_TICK_MS, DragSession, Trail};
use crate::event::{Event, Intent};
use crate::grid::{Board, Pos, RandomOrbs};
use crate::scheduler::{Millis, Scheduler};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Continuations queued on the engine clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Cascade,
    DragTick,
}

#[derive(Debug)]
pub struct GameState {
    board: Board,
    orbs: RandomOrbs,
    scheduler: Scheduler<Task>,
    cascade: Cascade,
    drag: Option<DragSession>,
    trail: Trail,
    drag_limit_ms: Millis,
    score: u64,
    last_combo: usize,
    /// Outbound events not yet collected by the front end.
    events: Vec<Event>,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        log::info!("new game, seed {seed}, {} colours", config.colors);
        let mut orbs = RandomOrbs::new(StdRng::seed_from_u64(seed), config.colors);
        let board = Board {
            grid: orbs.generate_grid(),
            ..Board::default()
        };
        let mut state = Self {
            board,
            orbs,
            scheduler: Scheduler::new(),
            cascade: Cascade::new(config.pacing),
            drag: None,
            trail: Trail::default(),
            drag_limit_ms: config.drag_limit_ms,
            score: 0,
            last_combo: 0,
            events: Vec::new(),
        };
        state.events.push(board_changed(&state.board));
        state.events.push(Event::TimerTick {
            remaining_ms: state.drag_limit_ms,
        });
        state
    }

    /// Apply one intent, then run any continuation that is already due.
    pub fn handle(&mut self, intent: Intent) {
        match intent {
            Intent::Tick(now) => {
                self.run_until(now);
                return;
            }
            Intent::Reset => self.reset(),
            Intent::DragStart(pos) => self.begin_drag(pos),
            Intent::DragMove(pos) => self.move_drag(pos),
            Intent::DragRelease => self.release_drag(),
        }
        let now = self.scheduler.now();
        self.run_until(now);
    }

    /// Hand over everything emitted since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn is_resolving(&self) -> bool {
        self.cascade.is_active()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn run_until(&mut self, now: Millis) {
        while let Some(task) = self.scheduler.pop_due(now) {
            match task {
                Task::Cascade => self.step_cascade(),
                Task::DragTick => self.on_drag_tick(),
            }
        }
        self.scheduler.advance_to(now);
    }

    fn reset(&mut self) {
        if self.is_resolving() {
            log::debug!("reset ignored while resolving");
            return;
        }
        if let Some(drag) = self.drag.take() {
            if let Some(id) = drag.timer {
                self.scheduler.cancel(id);
            }
        }
        self.board = Board {
            grid: self.orbs.generate_grid(),
            ..Board::default()
        };
        resolve_all(&mut self.board.grid, &mut self.orbs);
        self.score = 0;
        self.last_combo = 0;
        log::info!("board reset");

        self.events.push(board_changed(&self.board));
        self.push_path_changed();
        self.events.push(Event::ScoreChanged {
            score: 0,
            last_combo: 0,
        });
        self.events.push(Event::TimerTick {
            remaining_ms: self.drag_limit_ms,
        });
    }

    fn begin_drag(&mut self, pos: Pos) {
        if self.is_resolving() {
            log::debug!("drag start at {pos:?} ignored while resolving");
            return;
        }
        if let Some(old) = self.drag.take() {
            if let Some(id) = old.timer {
                self.scheduler.cancel(id);
            }
        }
        self.drag = Some(DragSession::new(pos, self.board.grid.get(pos)));
        log::debug!("drag start at {pos:?}");
        self.events.push(Event::TimerTick {
            remaining_ms: self.drag_limit_ms,
        });
        self.push_path_changed();
    }

    fn move_drag(&mut self, target: Pos) {
        if self.is_resolving() {
            return;
        }
        let now = self.scheduler.now();
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        if !drag.accepts(target) {
            return;
        }
        let from = drag.current;
        self.board.grid.swap(from, target);
        self.board.enhanced.swap(from, target);
        self.trail.push(from, now);
        drag.visit(target);
        if drag.started_at.is_none() {
            drag.started_at = Some(now);
            drag.timer = Some(self.scheduler.schedule(DRAG_TICK_MS, Task::DragTick));
        }
        log::debug!("swap {from:?} -> {target:?}");

        self.events.push(board_changed(&self.board));
        self.push_path_changed();
    }

    /// Normal and forced release share this path. A resolution always follows.
    fn release_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if let Some(id) = drag.timer {
            self.scheduler.cancel(id);
        }
        log::info!(
            "drag of {:?} from {:?} released after {} cells, {} ms",
            drag.carried,
            drag.origin,
            drag.path().len(),
            drag.elapsed(self.scheduler.now())
        );
        self.events.push(Event::TimerTick {
            remaining_ms: self.drag_limit_ms,
        });
        self.push_path_changed();
        self.start_resolution();
    }

    fn on_drag_tick(&mut self) {
        let now = self.scheduler.now();
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let remaining_ms = self.drag_limit_ms.saturating_sub(drag.elapsed(now));
        log::trace!("drag timer {remaining_ms} ms left");
        self.events.push(Event::TimerTick { remaining_ms });
        if remaining_ms == 0 {
            log::info!("drag time limit reached");
            self.release_drag();
        } else {
            drag.timer = Some(self.scheduler.schedule(DRAG_TICK_MS, Task::DragTick));
        }
    }

    fn start_resolution(&mut self) {
        if self.is_resolving() {
            return;
        }
        self.cascade.start();
        self.scheduler.schedule(0, Task::Cascade);
    }

    fn step_cascade(&mut self) {
        log::trace!("cascade step in {:?}", self.cascade.phase());
        match self
            .cascade
            .step(&mut self.board, &mut self.orbs, &mut self.events)
        {
            Step::Wait(ms) => {
                self.scheduler.schedule(ms, Task::Cascade);
            }
            Step::Done(resolution) => self.finish_resolution(resolution),
        }
    }

    fn finish_resolution(&mut self, resolution: Resolution) {
        debug_assert_eq!(self.board.grid.empty_count(), 0, "board left with holes");
        if !self.board.enhanced.is_empty() {
            log::debug!("{} enhanced orbs on the board", self.board.enhanced.len());
        }
        self.score += resolution.score();
        self.last_combo = resolution.combos;
        log::info!(
            "resolution complete: {} removed, {} combos, score {}",
            resolution.removed,
            resolution.combos,
            self.score
        );
        self.events.push(Event::ResolutionComplete {
            removed: resolution.removed,
            combos: resolution.combos,
            score: self.score,
        });
        self.events.push(Event::ScoreChanged {
            score: self.score,
            last_combo: self.last_combo,
        });
    }

    fn push_path_changed(&mut self) {
        let now = self.scheduler.now();
        let (path, held) = self
            .drag
            .as_ref()
            .map_or((Vec::new(), None), |d| (d.path().to_vec(), Some(d.current)));
        self.events.push(Event::DragPathChanged {
            path,
            held,
            trail: self.trail.active(now).to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::Pacing;
    use crate::grid::{Cell, Grid, Orb};

    const QUIET: &str = "RBGYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB";

    fn config(pacing: Pacing) -> GameConfig {
        GameConfig {
            drag_limit_ms: 5_500,
            colors: 6,
            pacing,
            seed: Some(42),
        }
    }

    fn game_with(layout: &str, pacing: Pacing) -> GameState {
        let mut game = GameState::new(&config(pacing));
        game.board.grid = layout.parse::<Grid>().unwrap();
        game.drain_events();
        game
    }

    #[test]
    fn new_board_is_full_and_quiet() {
        let mut game = GameState::new(&config(Pacing::default()));
        assert_eq!(game.board.grid.empty_count(), 0);
        assert!(crate::matcher::find_matches(&game.board.grid).marks.is_empty());
        assert!(matches!(
            game.drain_events().first(),
            Some(Event::BoardChanged { .. })
        ));
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn same_seed_same_board() {
        let a = GameState::new(&config(Pacing::default()));
        let b = GameState::new(&config(Pacing::default()));
        assert_eq!(a.board.grid, b.board.grid);
    }

    #[test]
    fn drag_swaps_carried_orb_and_enhanced_flag() {
        let mut game = game_with(QUIET, Pacing::default());
        game.board.enhanced.insert(Pos::new(0, 0));
        game.handle(Intent::DragStart(Pos::new(0, 0)));
        game.handle(Intent::DragMove(Pos::new(1, 1)));
        game.handle(Intent::DragMove(Pos::new(1, 3))); // not adjacent, ignored

        let board = &game.board;
        assert_eq!(board.grid.get(Pos::new(1, 1)), Cell::Orb(Orb::Red));
        assert_eq!(board.grid.get(Pos::new(0, 0)), Cell::Orb(Orb::Yellow));
        assert!(board.enhanced.contains(Pos::new(1, 1)));
        assert!(!board.enhanced.contains(Pos::new(0, 0)));

        let paths: Vec<_> = game
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                Event::DragPathChanged { path, held, .. } => Some((path, held)),
                _ => None,
            })
            .collect();
        assert_eq!(
            paths.last(),
            Some(&(vec![Pos::new(0, 0), Pos::new(1, 1)], Some(Pos::new(1, 1))))
        );
    }

    #[test]
    fn timer_waits_for_first_move() {
        let mut game = game_with(QUIET, Pacing::default());
        game.handle(Intent::DragStart(Pos::new(2, 2)));
        game.handle(Intent::Tick(10_000));
        assert!(game.is_dragging());
        assert!(!game.is_resolving());
    }

    #[test]
    fn drag_times_out_into_a_resolution() {
        let mut game = game_with(QUIET, Pacing::instant());
        game.handle(Intent::DragStart(Pos::new(2, 2)));
        game.handle(Intent::DragMove(Pos::new(2, 3)));
        game.handle(Intent::Tick(5_499));
        assert!(game.is_dragging());
        game.drain_events();

        game.handle(Intent::Tick(5_500));
        assert!(!game.is_dragging());
        let events = game.drain_events();
        assert!(events.contains(&Event::TimerTick { remaining_ms: 0 }));
        assert!(events.contains(&Event::TimerTick { remaining_ms: 5_500 }));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::ResolutionComplete { .. }))
        );
        assert!(!game.is_resolving());
    }

    #[test]
    fn release_resolves_even_without_swaps() {
        let mut game = game_with("RRRYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB", Pacing::instant());
        game.handle(Intent::DragStart(Pos::new(4, 4)));
        game.handle(Intent::DragRelease);
        assert!(!game.is_resolving());
        assert!(game.score >= 130);
        assert!(crate::matcher::find_matches(&game.board.grid).marks.is_empty());
    }

    #[test]
    fn paced_cascade_runs_on_the_clock() {
        let mut game = game_with("RRRYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB", Pacing::default());
        game.handle(Intent::DragStart(Pos::new(4, 4)));
        game.handle(Intent::DragRelease);
        assert!(game.is_resolving());
        // Holding the group: nothing removed yet.
        game.handle(Intent::Tick(179));
        assert_eq!(game.board.grid.empty_count(), 0);
        game.handle(Intent::Tick(180));
        assert_eq!(game.board.grid.empty_count(), 3);
        game.handle(Intent::Tick(260));
        assert_eq!(game.board.grid.empty_count(), 0);
        assert!(game.is_resolving());
        game.handle(Intent::Tick(60_000));
        assert!(!game.is_resolving());
        assert!(game.score >= 130);
    }

    #[test]
    fn drag_start_is_ignored_while_resolving() {
        let mut game = game_with("RRRYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB", Pacing::default());
        game.handle(Intent::DragStart(Pos::new(4, 4)));
        game.handle(Intent::DragRelease);
        assert!(game.is_resolving());

        let grid = game.board.grid;
        let score = game.score;
        game.handle(Intent::DragStart(Pos::new(3, 3)));
        game.handle(Intent::DragMove(Pos::new(3, 4)));
        assert!(!game.is_dragging());
        assert_eq!(game.board.grid, grid);
        assert_eq!(game.score, score);
    }

    #[test]
    fn reset_is_ignored_while_resolving() {
        let mut game = game_with("RRRYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPHRB", Pacing::default());
        game.handle(Intent::DragStart(Pos::new(4, 4)));
        game.handle(Intent::DragRelease);
        let grid = game.board.grid;
        game.handle(Intent::Reset);
        assert_eq!(game.board.grid, grid);
        assert!(game.is_resolving());
    }

    #[test]
    fn reset_during_drag_cancels_it() {
        let mut game = game_with(QUIET, Pacing::default());
        game.score = 900;
        game.handle(Intent::DragStart(Pos::new(0, 0)));
        game.handle(Intent::DragMove(Pos::new(0, 1)));
        game.handle(Intent::Reset);
        assert!(!game.is_dragging());
        assert_eq!(game.score, 0);
        assert_eq!(game.board.grid.empty_count(), 0);
        let events = game.drain_events();
        assert!(events.contains(&Event::ScoreChanged {
            score: 0,
            last_combo: 0
        }));
        // The cancelled timer never fires.
        game.handle(Intent::Tick(60_000));
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn score_and_combo_reported_on_completion() {
        let mut game = game_with("RRRYPH\nGYPHRB\nPHRBGY\nRBGYPH\nGYPBBB", Pacing::instant());
        game.handle(Intent::DragStart(Pos::new(2, 2)));
        game.handle(Intent::DragRelease);
        let events = game.drain_events();
        let done = events.iter().find_map(|e| match e {
            Event::ResolutionComplete {
                removed,
                combos,
                score,
            } => Some((*removed, *combos, *score)),
            _ => None,
        });
        let (removed, combos, score) = done.unwrap();
        assert!(removed >= 6);
        assert!(combos >= 2);
        assert_eq!(score, removed as u64 * 10 + combos as u64 * 100);
        assert_eq!(
            events.last(),
            Some(&Event::ScoreChanged {
                score,
                last_combo: combos
            })
        );
    }
}
