//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while framing or parsing protocol lines.
///
/// Only [`ProtocolError::LineTooLong`] is fatal for a connection. The parse
/// errors describe lines the receiver is expected to ignore.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A line grew past the buffer capacity without a terminating newline.
    #[error("line exceeds {max} bytes without a newline")]
    LineTooLong {
        /// Buffer capacity in bytes
        max: usize,
    },

    /// Nickname is empty, too long, or contains characters outside
    /// `[A-Za-z0-9_]`.
    #[error("invalid nickname: {0:?}")]
    InvalidNickname(String),

    /// The line's verb is not part of the protocol.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// The line has a known verb but is missing its argument or has the wrong
    /// shape.
    #[error("malformed {0} line")]
    Malformed(&'static str),

    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}
