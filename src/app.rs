//! App: terminal init, main loop, engine clock, key and mouse handling.

use crate::event::{Event as GameEvent, Intent};
use crate::game::GameState;
use crate::grid::Pos;
use crate::input::{Action, key_to_action};
use crate::scheduler::Millis;
use crate::theme::Theme;
use crate::view::BoardView;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{
    self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::DefaultTerminal;
use ratatui::layout::{Position, Rect};
use std::time::{Duration, Instant};
use tachyonfx::{Duration as TfxDuration, Effect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Reset,
    Exit,
}

impl QuitOption {
    pub const ALL: [Self; 3] = [Self::Resume, Self::Reset, Self::Exit];

    pub fn label(self) -> &'static str {
        match self {
            Self::Resume => " Resume ",
            Self::Reset => " New board ",
            Self::Exit => " Exit ",
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Resume => Self::Reset,
            Self::Reset => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::Reset => Self::Resume,
            Self::Exit => Self::Reset,
        }
    }
}

pub struct App {
    theme: Theme,
    state: GameState,
    view: BoardView,
    screen: Screen,
    quit_selected: QuitOption,
    /// Keyboard cursor; the held orb follows it while grabbing.
    cursor: Pos,
    started: Instant,
    /// The engine clock stops while the quit menu is open.
    paused_since: Option<Instant>,
    paused_total: Duration,
    frame_duration: Duration,
    no_animation: bool,
    effects: Vec<Effect>,
    last_frame: Instant,
    /// Terminal area of the last frame, for mapping mouse positions.
    area: Rect,
}

impl App {
    pub fn new(args: &Args, config: &GameConfig, theme: Theme) -> Self {
        let state = GameState::new(config);
        let now = Instant::now();
        let fps = if args.frame_rate > 0.0 { args.frame_rate } else { 60.0 };
        Self {
            theme,
            state,
            view: BoardView::new(config.drag_limit_ms),
            screen: Screen::Playing,
            quit_selected: QuitOption::Resume,
            cursor: Pos::new(0, 0),
            started: now,
            paused_since: None,
            paused_total: Duration::ZERO,
            frame_duration: Duration::from_secs_f64(1.0 / fps),
            no_animation: args.no_animation,
            effects: Vec::new(),
            last_frame: now,
            area: Rect::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    /// Milliseconds of play so far, not counting time spent in the quit menu.
    fn engine_now(&self, now: Instant) -> Millis {
        let paused = self.paused_total
            + self
                .paused_since
                .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        now.saturating_duration_since(self.started)
            .saturating_sub(paused)
            .as_millis() as Millis
    }

    fn send(&mut self, intent: Intent) {
        self.state.handle(intent);
        for event in self.state.drain_events() {
            self.view.apply(&event);
            if !self.no_animation {
                self.effects
                    .extend(crate::ui::effect_for(&event, self.area, &self.theme));
            }
            if let GameEvent::DragPathChanged { held: Some(pos), .. } = event {
                self.cursor = pos;
            }
        }
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            if self.screen == Screen::Playing {
                let engine_now = self.engine_now(now);
                self.send(Intent::Tick(engine_now));
            }

            let delta = now.saturating_duration_since(self.last_frame);
            self.last_frame = now;
            let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u32::MAX as u128) as u32);
            let engine_now = self.engine_now(now);
            let cursor = (!self.state.is_dragging()).then_some(self.cursor);
            let mut area = self.area;
            terminal.draw(|f| {
                area = f.area();
                crate::ui::draw(
                    f,
                    self.screen,
                    &mut self.view,
                    &self.theme,
                    cursor,
                    engine_now,
                    self.quit_selected,
                );
                if self.screen == Screen::Playing {
                    crate::ui::render_effects(f, &mut self.effects, area, tfx_delta);
                }
            })?;
            self.area = area;

            let timeout = self.frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let keep_going = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.on_action(key_to_action(key))
                    }
                    Event::Mouse(mouse) => {
                        self.on_mouse(mouse);
                        true
                    }
                    _ => true,
                };
                if !keep_going {
                    return Ok(());
                }
            }
        }
    }

    /// Returns false when the player chose to exit.
    fn on_action(&mut self, action: Action) -> bool {
        match self.screen {
            Screen::Playing => match action {
                Action::Move(dr, dc) => {
                    self.cursor = self.cursor.offset_clamped(dr, dc);
                    if self.state.is_dragging() {
                        self.send(Intent::DragMove(self.cursor));
                    }
                }
                Action::Grab if self.state.is_dragging() => self.send(Intent::DragRelease),
                Action::Grab => self.send(Intent::DragStart(self.cursor)),
                Action::Reset => self.send(Intent::Reset),
                Action::Quit => self.open_quit_menu(),
                Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Move(dr, _) if dr > 0 => self.quit_selected = self.quit_selected.next(),
                Action::Move(dr, _) if dr < 0 => self.quit_selected = self.quit_selected.prev(),
                Action::Grab => match self.quit_selected {
                    QuitOption::Resume => self.close_quit_menu(),
                    QuitOption::Reset => {
                        self.close_quit_menu();
                        self.send(Intent::Reset);
                    }
                    QuitOption::Exit => return false,
                },
                Action::Quit => self.close_quit_menu(),
                _ => {}
            },
        }
        true
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if self.screen != Screen::Playing {
            return;
        }
        let board = crate::ui::board_rect(self.area);
        let pos = crate::ui::cell_at(board, mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left)
                if board.contains(Position::new(mouse.column, mouse.row)) =>
            {
                self.cursor = pos;
                self.send(Intent::DragStart(pos));
            }
            MouseEventKind::Drag(MouseButton::Left) if self.state.is_dragging() => {
                self.send(Intent::DragMove(pos));
            }
            MouseEventKind::Up(MouseButton::Left) if self.state.is_dragging() => {
                self.send(Intent::DragRelease);
            }
            _ => {}
        }
    }

    fn open_quit_menu(&mut self) {
        self.screen = Screen::QuitMenu;
        self.quit_selected = QuitOption::Resume;
        self.paused_since = Some(Instant::now());
    }

    fn close_quit_menu(&mut self) {
        if let Some(t) = self.paused_since.take() {
            self.paused_total += t.elapsed();
        }
        self.screen = Screen::Playing;
    }
}
