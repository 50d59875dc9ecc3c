use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::editor::command::{Command, Direction, ScaleStep};
use crate::graph::subtree::Scope;

/// Bulk operations reach the whole subtree while Ctrl and Shift are held.
pub fn scope_for(modifiers: KeyModifiers) -> Scope {
    if modifiers.contains(KeyModifiers::CONTROL | KeyModifiers::SHIFT) {
        Scope::Subtree
    } else {
        Scope::Single
    }
}

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Down => Some(Direction::Down),
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Right => Some(Direction::Right),
        _ => None,
    }
}

pub fn resolve_command(key: KeyEvent, text_mode: bool) -> Command {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let scope = scope_for(key.modifiers);

    if text_mode {
        return match key.code {
            KeyCode::Esc => Command::Cancel,
            KeyCode::Enter => Command::TextInput('\n'),
            KeyCode::Backspace => Command::TextBackspace,
            KeyCode::Char(c) if !ctrl => Command::TextInput(c),
            _ => Command::Noop,
        };
    }

    if let Some(direction) = direction_for(key.code) {
        return if ctrl {
            Command::Move(direction, scope)
        } else {
            Command::Pan(direction)
        };
    }

    if ctrl {
        return match key.code {
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                '+' | '=' => Command::Scale(ScaleStep::Up, scope),
                '-' | '_' => Command::Scale(ScaleStep::Down, scope),
                's' => Command::Save,
                'r' => Command::Reload,
                'n' => Command::NewDocument,
                'q' => Command::Quit,
                'c' => Command::RecolorBackground(scope),
                't' => Command::RecolorText(scope),
                'x' => Command::Delete(scope),
                _ => Command::Noop,
            },
            KeyCode::Delete => Command::Delete(scope),
            _ => Command::Noop,
        };
    }

    match key.code {
        KeyCode::Insert | KeyCode::Char('i') => Command::InsertChild,
        KeyCode::Delete | KeyCode::Char('x') => Command::Delete(Scope::Single),
        KeyCode::F(2) | KeyCode::Char('e') => Command::EditText,
        KeyCode::Char('c') => Command::RecolorBackground(Scope::Single),
        KeyCode::Char('t') => Command::RecolorText(Scope::Single),
        KeyCode::Char('a') => Command::BeginAddEdge,
        KeyCode::Char('d') => Command::BeginDeleteEdge,
        KeyCode::Char('f') => Command::ToggleHint,
        KeyCode::Char(c @ '0'..='9') => Command::HintDigit(c as u8 - b'0'),
        KeyCode::Char('+') | KeyCode::Char('=') => Command::ZoomView(ScaleStep::Up),
        KeyCode::Char('-') => Command::ZoomView(ScaleStep::Down),
        KeyCode::Enter => Command::CommitHint,
        KeyCode::Backspace => Command::HintBackspace,
        KeyCode::Esc => Command::Cancel,
        _ => Command::Noop,
    }
}
