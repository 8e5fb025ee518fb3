//! Line editor for raw-mode input.
//!
//! Owns the line being typed. Keys go in, and the outcome tells the caller
//! what to draw and whether a line is ready to send. The editor does no
//! rendering itself.

use linechat_proto::MAX_MESSAGE_LEN;

/// Key input events from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Ctrl-C or Ctrl-D.
    Interrupt,
}

/// Result of feeding one key to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Character appended; echo it.
    Echo(char),
    /// Last character removed; erase it on screen.
    Erase,
    /// Line finished. Empty lines are reported too so the caller can move
    /// to a fresh line.
    Submit(String),
    /// Key had no effect.
    Ignored,
    /// User asked to leave.
    Quit,
}

/// Single-line input buffer with a character limit.
#[derive(Debug)]
pub struct LineEditor {
    /// Text typed so far
    buffer: String,
    /// Number of characters in `buffer`
    len: usize,
    /// Maximum number of characters
    limit: usize,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    /// Create an editor limited to [`MAX_MESSAGE_LEN`] characters.
    pub fn new() -> Self {
        Self::with_limit(MAX_MESSAGE_LEN)
    }

    /// Create an editor limited to `limit` characters.
    pub fn with_limit(limit: usize) -> Self {
        Self { buffer: String::new(), len: 0, limit }
    }

    /// Text typed so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Handle a key input event.
    pub fn handle_key(&mut self, key: KeyInput) -> EditOutcome {
        match key {
            KeyInput::Char(c) if c.is_control() || self.len >= self.limit => EditOutcome::Ignored,
            KeyInput::Char(c) => {
                self.buffer.push(c);
                self.len += 1;
                EditOutcome::Echo(c)
            },
            KeyInput::Backspace => match self.buffer.pop() {
                Some(_) => {
                    self.len -= 1;
                    EditOutcome::Erase
                },
                None => EditOutcome::Ignored,
            },
            KeyInput::Enter => {
                self.len = 0;
                EditOutcome::Submit(std::mem::take(&mut self.buffer))
            },
            KeyInput::Interrupt => EditOutcome::Quit,
        }
    }
}
