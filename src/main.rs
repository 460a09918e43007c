//! orbtui: drag-path orb matching puzzle in the terminal.

mod app;
mod cascade;
mod drag;
mod event;
mod game;
mod gravity;
mod grid;
mod input;
mod logging;
mod matcher;
mod scheduler;
mod theme;
mod ui;
mod view;

use anyhow::Result;
use app::App;
use cascade::Pacing;
use clap::{Parser, ValueEnum};
use scheduler::Millis;

/// Options derived from CLI that affect engine behaviour (time limit, colours, pacing, seed).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub drag_limit_ms: Millis,
    pub colors: usize,
    pub pacing: Pacing,
    pub seed: Option<u64>,
}

impl From<&Args> for GameConfig {
    fn from(args: &Args) -> Self {
        Self {
            drag_limit_ms: args.drag_limit_ms,
            colors: args.colors as usize,
            pacing: if args.no_animation {
                Pacing::instant()
            } else {
                Pacing::default()
            },
            seed: args.seed,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        logging::init(path, args.log_level.into())?;
    }
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme not loaded, using defaults: {e}");
            let mut theme = theme::Theme::default();
            theme.apply_palette(args.palette);
            theme
        }
    };
    let config = GameConfig::from(&args);
    let mut app = App::new(&args, &config, theme);
    app.run()?;
    Ok(())
}

/// Drag-path orb matching puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "orbtui",
    version,
    about = "Drag-path orb matching puzzle in the terminal. Drag one orb around the board, then let go and watch the combos cascade.",
    long_about = "orbtui is a terminal orb matching puzzle.\n\n\
        Pick up an orb and drag it through the board; every cell it passes swaps places with it. \
        When you let go (or the drag timer runs out) every run of three or more same-coloured orbs \
        is cleared group by group, the board drops and refills, and new matches keep cascading. \
        Groups of five or more leave an enhanced orb behind.\n\n\
        CONTROLS:\n  Mouse       Press, drag and release on the board\n  \
        Arrows/hjkl Move cursor   y/u/b/n   Diagonals\n  \
        Space/Enter Grab / release  r        New board   q / Esc  Menu\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Drag time limit in milliseconds, counted from the first move.
    #[arg(long, default_value = "5500", value_name = "MS")]
    pub drag_limit_ms: Millis,

    /// Number of orb colours in play.
    #[arg(long, default_value = "6", value_name = "N", value_parser = clap::value_parser!(u8).range(3..=6))]
    pub colors: u8,

    /// Seed for the board generator and refills (random when omitted).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Disable match and fall pacing (cascades resolve instantly).
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write log records to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,

    /// Minimum level written to the log file.
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}
