//! Raw terminal mode and key translation.

use std::io;

use crossterm::{
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};

use crate::editor::KeyInput;

/// Keeps the terminal in raw mode while alive.
///
/// Raw mode turns off line buffering and local echo so every key reaches the
/// editor as it is pressed. Dropping the guard restores the previous mode,
/// including on early return through `?`.
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enable raw mode.
    ///
    /// # Errors
    ///
    /// Fails if standard input is not a terminal.
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            tracing::warn!(%err, "failed to restore terminal mode");
        }
    }
}

/// Convert a terminal event to editor input.
///
/// Only key presses are translated; releases, repeats, resizes and keys the
/// editor has no use for map to `None`.
pub fn key_input(event: &Event) -> Option<KeyInput> {
    let Event::Key(KeyEvent { code, modifiers, kind: KeyEventKind::Press, .. }) = event else {
        return None;
    };

    match code {
        KeyCode::Char('c' | 'd') if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyInput::Interrupt)
        },
        KeyCode::Char(_) if modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char(c) => Some(KeyInput::Char(*c)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        _ => None,
    }
}
