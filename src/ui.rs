//! Layout and drawing: board, drag path and trail, sidebar, quit menu, match and fall effects.

use crate::app::{QuitOption, Screen};
use crate::event::Event;
use crate::grid::{COLS, Cell, Pos, ROWS};
use crate::scheduler::Millis;
use crate::theme::Theme;
use crate::view::BoardView;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal cells per board cell.
const CELL_WIDTH: u16 = 6;
const CELL_HEIGHT: u16 = 3;

const SIDEBAR_WIDTH: u16 = 24;

/// Timer gauge switches to the warning colour at or below this.
const TIME_WARNING_MS: Millis = 2_000;

/// Board with its border, in terminal cells.
const fn board_outer_size() -> (u16, u16) {
    (COLS as u16 * CELL_WIDTH + 2, ROWS as u16 * CELL_HEIGHT + 2)
}

/// Outer board rect and sidebar rect, centred in `area` the same way on every frame.
fn layout(area: Rect) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size();
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bw + SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Board interior (no border) for a given terminal area. Mouse mapping uses this too.
pub fn board_rect(area: Rect) -> Rect {
    let (outer, _) = layout(area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (COLS as u16 * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (ROWS as u16 * CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

/// Board cell under a terminal position; positions off the board clamp to the nearest cell.
pub fn cell_at(board: Rect, column: u16, row: u16) -> Pos {
    let col = column.saturating_sub(board.x) / CELL_WIDTH;
    let r = row.saturating_sub(board.y) / CELL_HEIGHT;
    Pos::new(
        (r as usize).min(ROWS - 1),
        (col as usize).min(COLS - 1),
    )
}

fn cell_rect(board: Rect, pos: Pos) -> Rect {
    Rect {
        x: board.x + pos.col as u16 * CELL_WIDTH,
        y: board.y + pos.row as u16 * CELL_HEIGHT,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    }
    .intersection(board)
}

/// Buffer positions covered by the given board cells.
fn buffer_positions(board: Rect, cells: impl IntoIterator<Item = Pos>) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for pos in cells {
        let r = cell_rect(board, pos);
        for y in r.top()..r.bottom() {
            for x in r.left()..r.right() {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Effect to start for an engine event, if it has one: matched groups fade out over their
/// hold, fallen orbs fade in over the fall time.
pub fn effect_for(event: &Event, area: Rect, theme: &Theme) -> Option<Effect> {
    let board = board_rect(area);
    let bg = theme.bg;
    let (cells, ms, interpolation): (HashSet<(u16, u16)>, Millis, Interpolation) = match event {
        Event::GroupMatched { cells, hold_ms, .. } if *hold_ms > 0 => (
            buffer_positions(board, cells.iter().copied()),
            *hold_ms,
            Interpolation::Linear,
        ),
        Event::Settled { falls, fall_ms } if *fall_ms > 0 && !falls.is_empty() => (
            buffer_positions(board, falls.iter().map(|(p, _)| p)),
            *fall_ms,
            Interpolation::QuadOut,
        ),
        _ => return None,
    };
    let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
        cells.contains(&(pos.x, pos.y))
    }));
    let timer = (ms as u32, interpolation);
    let effect = match event {
        Event::GroupMatched { .. } => fx::fade_to(bg, bg, timer),
        _ => fx::fade_from(bg, bg, timer),
    };
    Some(effect.with_filter(filter).with_area(board))
}

/// Run every live effect for `delta`, dropping the finished ones.
pub fn render_effects(frame: &mut Frame, effects: &mut Vec<Effect>, area: Rect, delta: TfxDuration) {
    let board = board_rect(area);
    for effect in effects.iter_mut() {
        frame.render_effect(effect, board, delta);
    }
    effects.retain(|e| !e.done());
}

/// Draw the current screen. `now` is engine time, used to expire trail marks.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    view: &mut BoardView,
    theme: &Theme,
    cursor: Option<Pos>,
    now: Millis,
    quit_selected: QuitOption,
) {
    let area = frame.area();
    let (board_outer, sidebar) = layout(area);
    draw_board(frame, view, theme, board_outer, cursor, now);
    draw_sidebar(frame, view, theme, sidebar);
    if screen == Screen::QuitMenu {
        draw_quit_menu(frame, theme, quit_selected);
    }
}

fn draw_board(
    frame: &mut Frame,
    view: &mut BoardView,
    theme: &Theme,
    outer: Rect,
    cursor: Option<Pos>,
    now: Millis,
) {
    let title = if view.combo > 0 {
        format!(" {} Combo ", view.combo)
    } else {
        " orbtui ".to_string()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    block.render(outer, frame.buffer_mut());
    let board = board_rect(frame.area());

    let trail: HashSet<Pos> = view.trail(now).iter().map(|m| m.pos).collect();
    for pos in Pos::all() {
        let r = cell_rect(board, pos);
        if r.is_empty() {
            continue;
        }
        let margin_bg = match view.highlight_at(pos) {
            Some(h) if h.big => theme.warn,
            Some(h) => theme.orb_color(h.orb),
            None if view.on_path(pos) => theme.selected_bg,
            None if trail.contains(&pos) => theme.div_line,
            None => theme.bg,
        };
        let buf = frame.buffer_mut();
        for y in r.top()..r.bottom() {
            for x in r.left()..r.right() {
                buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(margin_bg));
            }
        }

        if let Cell::Orb(orb) = view.grid.get(pos) {
            let color = theme.orb_color(orb);
            let rows = ["▄▄▄▄", "████", "▀▀▀▀"];
            for (dy, glyphs) in rows.iter().enumerate() {
                let y = r.y + dy as u16;
                if y < r.bottom() {
                    buf.set_string(r.x + 1, y, glyphs, Style::default().fg(color).bg(margin_bg));
                }
            }
            if view.enhanced.contains(pos) {
                buf.set_string(
                    r.x + 2,
                    r.y + 1,
                    "◆◆",
                    Style::default().fg(theme.bg).bg(color),
                );
            }
        }

        let marker = if view.held == Some(pos) {
            Some(theme.hi_fg)
        } else if cursor == Some(pos) {
            Some(theme.main_fg)
        } else {
            None
        };
        if let Some(fg) = marker {
            let style = Style::default().fg(fg).bg(margin_bg);
            buf.set_string(r.x, r.y + 1, "▐", style);
            buf.set_string(r.right() - 1, r.y + 1, "▌", style);
        }
    }
}

fn draw_sidebar(frame: &mut Frame, view: &BoardView, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Stats
            Constraint::Length(1),
            Constraint::Length(4), // Time
            Constraint::Length(1),
            Constraint::Min(0), // Keys
        ])
        .split(area);

    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let combo_label = if view.combo > 0 {
        format!("{} Combo", view.combo)
    } else {
        String::new()
    };
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(view.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Last combo: ", title_style),
            Span::styled(view.last_combo.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Cleared: ", title_style),
            Span::styled(view.last_removed.to_string(), fg_style),
        ]),
        Line::from(Span::styled(combo_label, title_style)),
    ];
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let time_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let time_inner = time_block.inner(chunks[2]);
    time_block.render(chunks[2], frame.buffer_mut());
    let time_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(time_inner);
    Paragraph::new(Line::from(vec![
        Span::styled("Time ", title_style),
        Span::styled(
            format!("{:.1}s", view.remaining_ms as f64 / 1000.0),
            fg_style,
        ),
    ]))
    .render(time_layout[0], frame.buffer_mut());
    let bar_color = if view.remaining_ms <= TIME_WARNING_MS {
        theme.warn
    } else {
        theme.hi_fg
    };
    Gauge::default()
        .ratio(view.time_ratio())
        .label("")
        .gauge_style(Style::default().fg(bar_color).bg(theme.inactive_fg))
        .render(time_layout[1], frame.buffer_mut());

    let keys = [
        ("mouse", "drag orbs"),
        ("hjkl/yubn", "cursor"),
        ("space", "grab/drop"),
        ("r", "new board"),
        ("q", "menu"),
    ];
    let help: Vec<Line> = keys
        .iter()
        .map(|(k, what)| {
            Line::from(vec![
                Span::styled(format!("{k:>9} "), Style::default().fg(theme.inactive_fg)),
                Span::styled(*what, fg_style),
            ])
        })
        .collect();
    Paragraph::new(Text::from(help)).render(chunks[4], frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw.min(area.width),
        height: qh.min(area.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    for y in quit_rect.top()..quit_rect.bottom() {
        for x in quit_rect.left()..quit_rect.right() {
            frame.buffer_mut()[(x, y)]
                .set_symbol(" ")
                .set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    for (i, opt) in QuitOption::ALL.into_iter().enumerate() {
        let label = opt.label();
        let style = if opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.bottom() {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
