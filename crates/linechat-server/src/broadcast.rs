//! Outbound line delivery.
//!
//! [`LineSink`] separates the registry (pure state) from the socket that
//! actually carries bytes. Production wires it to a TCP write half; tests use
//! an in-memory buffer that can be told to fail.
//!
//! # Failure isolation
//!
//! A failed write never stops a broadcast. The failing connection is marked
//! and the broadcast moves on to the next slot; the runtime removes marked
//! connections at the top of its next loop iteration.

use std::io;

use crate::registry::{ConnectionRegistry, SlotId};

/// Destination for complete protocol lines.
///
/// Implementations must not block: a write that cannot complete immediately
/// is reported as an error, and the connection is dropped.
pub trait LineSink {
    /// Write one encoded line, terminator included.
    ///
    /// # Errors
    ///
    /// Any I/O error, including `WouldBlock`. The caller treats every error as
    /// fatal for this connection.
    fn send_line(&mut self, line: &[u8]) -> io::Result<()>;
}

/// Whether a chat line is echoed back to its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastPolicy {
    /// Deliver to every registered connection, the sender included.
    #[default]
    IncludeSender,

    /// Deliver to every registered connection except the sender.
    ExcludeSender,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Connections the line was written to
    pub delivered: usize,
    /// Connections whose write failed and are now marked for removal
    pub failed: usize,
}

impl<H: LineSink> ConnectionRegistry<H> {
    /// Write a line to a single connection.
    ///
    /// Returns `false` if the slot is free, already failed, or the write
    /// failed (in which case the connection is marked failed).
    pub fn send_to(&mut self, slot: SlotId, line: &[u8]) -> bool {
        let Some(conn) = self.get_mut(slot) else {
            return false;
        };
        if conn.is_failed() {
            return false;
        }

        match conn.handle_mut().send_line(line) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(slot, %err, "write failed, dropping connection");
                conn.mark_failed();
                false
            },
        }
    }

    /// Write a line to every registered connection.
    ///
    /// Unregistered and already failed connections are skipped, as is
    /// `exclude` when given.
    pub fn broadcast(&mut self, line: &[u8], exclude: Option<SlotId>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (slot, conn) in self.iter_mut() {
            if Some(slot) == exclude || !conn.is_registered() || conn.is_failed() {
                continue;
            }

            match conn.handle_mut().send_line(line) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(slot, %err, "broadcast write failed, dropping connection");
                    conn.mark_failed();
                    report.failed += 1;
                },
            }
        }

        report
    }
}
