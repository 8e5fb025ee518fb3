//! Server error types.

use thiserror::Error;

/// Errors that stop the server from starting or running.
///
/// Per-connection failures never surface here: they are logged and the
/// connection is dropped.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error (malformed bind address, no resolvable address).
    ///
    /// Fatal at startup. Fix the arguments and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport error (bind or listen failed on every resolved address).
    #[error("transport error: {0}")]
    Transport(String),
}
