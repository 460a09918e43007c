//! Key bindings: arrows, vim-style hjkl, and yubn for diagonals.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the cursor by (rows, cols). While grabbing, this drags the held orb.
    Move(isize, isize),
    /// Pick up the orb under the cursor, or let go of the held one.
    Grab,
    Reset,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl, yubn).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r' | 'R') => Action::Reset,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Grab,
        KeyCode::Up | KeyCode::Char('k') => Action::Move(-1, 0),
        KeyCode::Down | KeyCode::Char('j') => Action::Move(1, 0),
        KeyCode::Left | KeyCode::Char('h') => Action::Move(0, -1),
        KeyCode::Right | KeyCode::Char('l') => Action::Move(0, 1),
        KeyCode::Char('y') => Action::Move(-1, -1),
        KeyCode::Char('u') => Action::Move(-1, 1),
        KeyCode::Char('b') => Action::Move(1, -1),
        KeyCode::Char('n') => Action::Move(1, 1),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        assert_eq!(key_to_action(key(KeyCode::Up)), key_to_action(key(KeyCode::Char('k'))));
        assert_eq!(key_to_action(key(KeyCode::Left)), Action::Move(0, -1));
        assert_eq!(key_to_action(key(KeyCode::Char('l'))), Action::Move(0, 1));
    }

    #[test]
    fn diagonals() {
        assert_eq!(key_to_action(key(KeyCode::Char('y'))), Action::Move(-1, -1));
        assert_eq!(key_to_action(key(KeyCode::Char('n'))), Action::Move(1, 1));
    }

    #[test]
    fn control_chords_are_ignored() {
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_r), Action::None);
        assert_eq!(key_to_action(key(KeyCode::Char('R'))), Action::Reset);
        assert_eq!(key_to_action(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(key_to_action(key(KeyCode::Char(' '))), Action::Grab);
    }
}
