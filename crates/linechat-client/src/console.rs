//! Console rendering.
//!
//! Writes status lines, chat lines and the echo of the line being typed. Line
//! endings are `\r\n` so output stays aligned while the terminal is in raw
//! mode. Generic over the writer so rendering can be checked against a byte
//! buffer.

use std::io::{self, Write};

use crossterm::{
    QueueableCommand,
    cursor::MoveToColumn,
    terminal::{Clear, ClearType},
};

use crate::event::ChatLine;

/// Erases the character left of the cursor.
const ERASE: &[u8] = b"\x08 \x08";

/// Terminal output for one session.
#[derive(Debug)]
pub struct Console<W: Write> {
    out: W,
}

impl<W: Write> Console<W> {
    /// Wrap a writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the console, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a status line.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn status(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}\r\n")?;
        self.out.flush()
    }

    /// Print a chat line above the input being typed, then redraw the input.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn chat_line(&mut self, line: &ChatLine, pending: &str) -> io::Result<()> {
        self.out.queue(MoveToColumn(0))?.queue(Clear(ClearType::CurrentLine))?;
        write!(self.out, "{line}\r\n{pending}")?;
        self.out.flush()
    }

    /// Echo a typed character.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn echo(&mut self, c: char) -> io::Result<()> {
        write!(self.out, "{c}")?;
        self.out.flush()
    }

    /// Erase the last typed character.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn erase(&mut self) -> io::Result<()> {
        self.out.write_all(ERASE)?;
        self.out.flush()
    }

    /// Move to a fresh line after the user pressed Enter.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn newline(&mut self) -> io::Result<()> {
        self.out.write_all(b"\r\n")?;
        self.out.flush()
    }
}
