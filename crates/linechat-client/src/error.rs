//! Client error types.

use std::io;

use linechat_proto::ProtocolError;
use thiserror::Error;

/// Errors that end a client session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the server (bad address, resolution or connect
    /// failure).
    #[error("connection failed: {0}")]
    Connect(String),

    /// Socket I/O failed after the connection was established.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server sent a line that broke framing.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server answered `NICK` with `ERR`.
    #[error("nickname rejected: {0}")]
    Rejected(String),

    /// The server sent something other than the expected handshake reply.
    #[error("unexpected reply during handshake: {0:?}")]
    UnexpectedReply(String),

    /// The server closed the connection before registration completed.
    #[error("server closed the connection during handshake")]
    ClosedDuringHandshake,

    /// Terminal setup or event reading failed.
    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),
}
