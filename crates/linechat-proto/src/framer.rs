//! Newline framing over a byte stream.
//!
//! A [`LineFramer`] owns the inbound buffer of one connection. Every read is
//! pushed into it; complete lines come out in arrival order and the
//! unterminated tail stays buffered for the next read.
//!
//! # Invariants
//!
//! - Chunking invariance: the sequence of yielded lines depends only on the
//!   bytes pushed, never on how they were split across calls.
//! - Bounded buffer: the buffer never holds more than `capacity` bytes. A line
//!   that would exceed it is a [`ProtocolError::LineTooLong`] overflow, never a
//!   silent truncation.

use bytes::{Bytes, BytesMut};

use crate::{
    LINE_TERMINATOR, MAX_LINE_LEN,
    errors::{ProtocolError, Result},
};

/// Reassembles newline-terminated lines out of partial reads.
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes received but not yet resolved into a complete line
    buf: BytesMut,
    /// Maximum number of buffered bytes
    capacity: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Create a framer with the protocol's default capacity
    /// ([`MAX_LINE_LEN`]).
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_LEN)
    }

    /// Create a framer whose buffer holds at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), capacity }
    }

    /// Maximum number of bytes the framer buffers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered bytes waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Append newly read bytes and return every line they complete.
    ///
    /// Lines are returned without their terminating `\n`. Any bytes after the
    /// last newline remain buffered.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::LineTooLong` if a line grows past the capacity. The
    ///   buffer is cleared and lines completed earlier in the same call are
    ///   discarded; the caller is expected to drop the connection.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        let mut lines = Vec::new();
        let mut rest = data;

        while let Some(pos) = rest.iter().position(|&b| b == LINE_TERMINATOR) {
            self.append(&rest[..pos])?;
            lines.push(self.buf.split().freeze());
            rest = &rest[pos + 1..];
        }

        self.append(rest)?;
        Ok(lines)
    }

    /// Take the unterminated tail, if any.
    ///
    /// Used when the peer disconnects: a final line that never received its
    /// newline is still handed to the caller.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() { None } else { Some(self.buf.split().freeze()) }
    }

    fn append(&mut self, segment: &[u8]) -> Result<()> {
        if self.buf.len() + segment.len() > self.capacity {
            self.buf.clear();
            return Err(ProtocolError::LineTooLong { max: self.capacity });
        }

        self.buf.extend_from_slice(segment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(lines: &[Bytes]) -> Vec<&str> {
        lines.iter().map(|l| std::str::from_utf8(l).unwrap()).collect()
    }

    #[test]
    fn single_complete_line() {
        let mut framer = LineFramer::new();

        let lines = framer.push(b"NICK bob\n").unwrap();
        assert_eq!(strings(&lines), vec!["NICK bob"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn several_lines_in_one_read() {
        let mut framer = LineFramer::new();

        let lines = framer.push(b"HELLO 1\nOK\nMSG bob hi\n").unwrap();
        assert_eq!(strings(&lines), vec!["HELLO 1", "OK", "MSG bob hi"]);
    }

    #[test]
    fn tail_is_held_until_newline() {
        let mut framer = LineFramer::new();

        assert!(framer.push(b"MSG hel").unwrap().is_empty());
        assert_eq!(framer.pending(), 7);

        let lines = framer.push(b"lo\nMSG wor").unwrap();
        assert_eq!(strings(&lines), vec!["MSG hello"]);
        assert_eq!(framer.pending(), 7);

        let lines = framer.push(b"ld\n").unwrap();
        assert_eq!(strings(&lines), vec!["MSG world"]);
    }

    #[test]
    fn single_byte_reads() {
        let mut framer = LineFramer::new();
        let mut lines = Vec::new();

        for byte in b"OK\nERR invalid nick\n" {
            lines.extend(framer.push(std::slice::from_ref(byte)).unwrap());
        }

        assert_eq!(strings(&lines), vec!["OK", "ERR invalid nick"]);
    }

    #[test]
    fn empty_lines_are_yielded() {
        let mut framer = LineFramer::new();

        let lines = framer.push(b"\n\nOK\n").unwrap();
        assert_eq!(strings(&lines), vec!["", "", "OK"]);
    }

    #[test]
    fn line_at_capacity_is_accepted() {
        let mut framer = LineFramer::with_capacity(8);

        let lines = framer.push(b"12345678\n").unwrap();
        assert_eq!(strings(&lines), vec!["12345678"]);
    }

    #[test]
    fn line_over_capacity_overflows() {
        let mut framer = LineFramer::with_capacity(8);

        let err = framer.push(b"123456789\n").unwrap_err();
        assert_eq!(err, ProtocolError::LineTooLong { max: 8 });
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn overflow_across_reads_without_newline() {
        let mut framer = LineFramer::with_capacity(8);

        assert!(framer.push(b"12345").unwrap().is_empty());
        let err = framer.push(b"6789").unwrap_err();
        assert_eq!(err, ProtocolError::LineTooLong { max: 8 });
    }

    #[test]
    fn newline_resets_the_budget() {
        let mut framer = LineFramer::with_capacity(4);

        let lines = framer.push(b"abcd\nefgh\nij").unwrap();
        assert_eq!(strings(&lines), vec!["abcd", "efgh"]);
        assert_eq!(framer.pending(), 2);
    }

    #[test]
    fn finish_takes_unterminated_tail() {
        let mut framer = LineFramer::new();

        framer.push(b"MSG alice bye").unwrap();
        let tail = framer.finish().unwrap();
        assert_eq!(&tail[..], b"MSG alice bye");
        assert!(framer.finish().is_none());
    }

    #[test]
    fn carriage_return_is_not_special() {
        let mut framer = LineFramer::new();

        let lines = framer.push(b"OK\r\n").unwrap();
        assert_eq!(&lines[0][..], b"OK\r");
    }
}
