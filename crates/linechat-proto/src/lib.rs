//! Linechat wire protocol.
//!
//! The protocol is newline-delimited text over a byte stream. Every line is a
//! verb followed by an optional space-separated argument:
//!
//! | Direction | Line                | Meaning                              |
//! |-----------|---------------------|--------------------------------------|
//! | S→C       | `HELLO <ver>`       | greeting, sent once on accept        |
//! | C→S       | `NICK <name>`       | registration request                 |
//! | S→C       | `OK`                | registration accepted                |
//! | S→C       | `ERR <reason>`      | registration rejected                |
//! | C→S       | `MSG <text>`        | chat line, requires prior `OK`       |
//! | S→C       | `MSG <nick> <text>` | chat line broadcast by the server    |
//!
//! # Components
//!
//! - [`LineFramer`]: reassembles complete lines out of arbitrarily split reads
//! - [`Nickname`]: validated nickname (`^[A-Za-z0-9_]{1,12}$`)
//! - [`ClientMessage`] / [`ServerMessage`]: parsed lines for each direction
//!
//! The crate performs no I/O. Both the server and the client feed raw bytes
//! into a [`LineFramer`] and hand each framed line to the message parsers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod framer;
mod message;
mod nickname;

pub use errors::{ProtocolError, Result};
pub use framer::LineFramer;
pub use message::{ClientMessage, ServerMessage};
pub use nickname::{Nickname, is_valid_nickname};

/// Protocol version announced in the server greeting.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum nickname length in characters.
pub const MAX_NICK_LEN: usize = 12;

/// Capacity of an inbound line buffer in bytes.
///
/// A line whose content (excluding the terminating `\n`) is longer than this
/// is a framing overflow.
pub const MAX_LINE_LEN: usize = 4096;

/// Maximum length of a chat line typed by a user, in characters.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Line terminator.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Reason sent with `ERR` when a `NICK` request is rejected.
pub const INVALID_NICK_REASON: &str = "invalid nick";
