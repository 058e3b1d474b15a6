//! Key events to binding trigger strings
//!
//! Bindings are stored as plain strings ("left", "space", "shift+c") so they
//! can be edited by hand. This module names a terminal key event the same way.

use crate::engine::Action;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a bound key asks the driver to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Play(Action),
    Quit,
}

/// The trigger string for a key event, or None for keys that cannot be bound
pub fn trigger_name(key: &KeyEvent) -> Option<String> {
    let base = match key.code {
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_lowercase().to_string(),
        _ => return None,
    };

    let mut name = String::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        name.push_str("ctrl+");
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        name.push_str("alt+");
    }
    let shifted = match key.code {
        // Terminals report shifted letters as uppercase, sometimes without the flag
        KeyCode::Char(c) if c.is_alphabetic() => {
            c.is_uppercase() || key.modifiers.contains(KeyModifiers::SHIFT)
        }
        // shifted symbols already arrive as their own glyph
        KeyCode::Char(_) => false,
        _ => key.modifiers.contains(KeyModifiers::SHIFT),
    };
    if shifted {
        name.push_str("shift+");
    }
    name.push_str(&base);
    Some(name)
}
