//! Session events and actions.

use std::fmt;

use bytes::Bytes;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Reading bytes from the server socket
/// - Reporting when the server closes the connection
/// - Forwarding lines the user typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Bytes read from the server.
    BytesReceived(Bytes),

    /// The user submitted a line of chat text.
    Submit(String),

    /// The server closed the connection or the read failed.
    ConnectionLost,
}

/// Actions the session asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write bytes to the server.
    Send(Bytes),

    /// The server greeted us.
    Greeted {
        /// The greeting line, without terminator
        greeting: String,
    },

    /// The server accepted our nickname.
    Registered,

    /// Show a chat line to the user.
    Display(ChatLine),

    /// The session is over; the caller should exit.
    Closed,
}

/// A chat line from another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Nickname of the sender
    pub nick: String,
    /// Chat text
    pub text: String,
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.nick, self.text)
    }
}
