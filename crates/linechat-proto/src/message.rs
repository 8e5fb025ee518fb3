//! Wire messages for both directions.
//!
//! A framed line is `<VERB>[ <argument>]`. The verb ends at the first space;
//! everything after it is the argument, spaces included. Messages render
//! without their terminator through [`Display`](fmt::Display) and with it
//! through `encode`.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    INVALID_NICK_REASON, LINE_TERMINATOR, PROTOCOL_VERSION,
    errors::{ProtocolError, Result},
    nickname::Nickname,
};

/// Lines a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `NICK <name>`: registration request.
    ///
    /// Carries the raw candidate, not a [`Nickname`]: an invalid name is a
    /// well-formed request that the server answers with `ERR`.
    Nick(String),

    /// `MSG <text>`: chat line from a registered client.
    Msg(String),
}

impl ClientMessage {
    /// Parse a framed line received by the server.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidUtf8` if the line is not UTF-8
    /// - `ProtocolError::UnknownCommand` for verbs other than `NICK`/`MSG`
    /// - `ProtocolError::Malformed` for `MSG` without text
    pub fn parse(line: &[u8]) -> Result<Self> {
        let (verb, rest) = split_verb(line)?;

        match verb {
            "NICK" => Ok(Self::Nick(rest.unwrap_or_default().to_owned())),
            "MSG" => {
                rest.map(|text| Self::Msg(text.to_owned())).ok_or(ProtocolError::Malformed("MSG"))
            },
            other => Err(ProtocolError::UnknownCommand(other.to_owned())),
        }
    }

    /// Write the line, including its terminator.
    pub fn encode(&self, dst: &mut impl BufMut) {
        encode_line(self, dst);
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nick(name) => write!(f, "NICK {name}"),
            Self::Msg(text) => write!(f, "MSG {text}"),
        }
    }
}

/// Lines the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `HELLO <version>`: greeting sent once on accept.
    Hello {
        /// Announced protocol version
        version: String,
    },

    /// `OK`: registration accepted.
    Ok,

    /// `ERR <reason>`: registration rejected.
    Err {
        /// Human-readable reason
        reason: String,
    },

    /// `MSG <nick> <text>`: broadcast chat line.
    Msg {
        /// Nickname of the sender
        nick: String,
        /// Chat text, may contain spaces
        text: String,
    },
}

impl ServerMessage {
    /// Greeting for the current [`PROTOCOL_VERSION`].
    pub fn greeting() -> Self {
        Self::Hello { version: PROTOCOL_VERSION.to_string() }
    }

    /// Rejection sent for an invalid `NICK`.
    pub fn invalid_nick() -> Self {
        Self::Err { reason: INVALID_NICK_REASON.to_owned() }
    }

    /// Broadcast line for `text` sent by `nick`.
    pub fn chat(nick: &Nickname, text: &str) -> Self {
        Self::Msg { nick: nick.as_str().to_owned(), text: text.to_owned() }
    }

    /// Parse a framed line received by the client.
    ///
    /// The greeting verb is matched case-insensitively so that older servers
    /// announcing `Hello 1` are still accepted.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidUtf8` if the line is not UTF-8
    /// - `ProtocolError::UnknownCommand` for unrecognized verbs
    /// - `ProtocolError::Malformed` for `MSG` without both nick and text
    pub fn parse(line: &[u8]) -> Result<Self> {
        let (verb, rest) = split_verb(line)?;

        if verb.eq_ignore_ascii_case("HELLO") {
            return Ok(Self::Hello { version: rest.unwrap_or_default().to_owned() });
        }

        match verb {
            "OK" => Ok(Self::Ok),
            "ERR" => Ok(Self::Err { reason: rest.unwrap_or_default().to_owned() }),
            "MSG" => {
                let (nick, text) =
                    rest.and_then(|r| r.split_once(' ')).ok_or(ProtocolError::Malformed("MSG"))?;
                Ok(Self::Msg { nick: nick.to_owned(), text: text.to_owned() })
            },
            other => Err(ProtocolError::UnknownCommand(other.to_owned())),
        }
    }

    /// Length of the encoded line in bytes, excluding the terminator.
    ///
    /// A receiver framing with [`MAX_LINE_LEN`](crate::MAX_LINE_LEN) accepts
    /// the line only if this does not exceed it.
    pub fn line_len(&self) -> usize {
        match self {
            Self::Hello { version } if version.is_empty() => "HELLO".len(),
            Self::Hello { version } => "HELLO ".len() + version.len(),
            Self::Ok => "OK".len(),
            Self::Err { reason } => "ERR ".len() + reason.len(),
            Self::Msg { nick, text } => "MSG ".len() + nick.len() + 1 + text.len(),
        }
    }

    /// Write the line, including its terminator.
    pub fn encode(&self, dst: &mut impl BufMut) {
        encode_line(self, dst);
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello { version } if version.is_empty() => f.write_str("HELLO"),
            Self::Hello { version } => write!(f, "HELLO {version}"),
            Self::Ok => f.write_str("OK"),
            Self::Err { reason } => write!(f, "ERR {reason}"),
            Self::Msg { nick, text } => write!(f, "MSG {nick} {text}"),
        }
    }
}

fn split_verb(line: &[u8]) -> Result<(&str, Option<&str>)> {
    let line = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;

    Ok(match line.split_once(' ') {
        Some((verb, rest)) => (verb, Some(rest)),
        None => (line, None),
    })
}

fn encode_line(message: &impl fmt::Display, dst: &mut impl BufMut) {
    let line = message.to_string();
    debug_assert!(!line.contains('\n'), "protocol lines never embed a terminator");

    dst.put_slice(line.as_bytes());
    dst.put_u8(LINE_TERMINATOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nick() {
        assert_eq!(ClientMessage::parse(b"NICK bob"), Ok(ClientMessage::Nick("bob".into())));
    }

    #[test]
    fn nick_keeps_the_whole_remainder() {
        assert_eq!(
            ClientMessage::parse(b"NICK bob smith"),
            Ok(ClientMessage::Nick("bob smith".into()))
        );
    }

    #[test]
    fn bare_nick_is_an_empty_candidate() {
        assert_eq!(ClientMessage::parse(b"NICK"), Ok(ClientMessage::Nick(String::new())));
    }

    #[test]
    fn parse_msg_with_spaces() {
        assert_eq!(
            ClientMessage::parse(b"MSG hello there  world"),
            Ok(ClientMessage::Msg("hello there  world".into()))
        );
    }

    #[test]
    fn bare_msg_is_malformed() {
        assert_eq!(ClientMessage::parse(b"MSG"), Err(ProtocolError::Malformed("MSG")));
    }

    #[test]
    fn client_verbs_are_case_sensitive() {
        assert_eq!(
            ClientMessage::parse(b"nick bob"),
            Err(ProtocolError::UnknownCommand("nick".into()))
        );
    }

    #[test]
    fn non_utf8_is_rejected() {
        assert_eq!(ClientMessage::parse(b"MSG \xff\xfe"), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn client_encoding_appends_terminator() {
        assert_eq!(&ClientMessage::Nick("bob".into()).to_bytes()[..], b"NICK bob\n");
        assert_eq!(&ClientMessage::Msg("hi all".into()).to_bytes()[..], b"MSG hi all\n");
    }

    #[test]
    fn greeting_line() {
        assert_eq!(&ServerMessage::greeting().to_bytes()[..], b"HELLO 1\n");
    }

    #[test]
    fn greeting_is_case_insensitive() {
        assert_eq!(
            ServerMessage::parse(b"Hello 1"),
            Ok(ServerMessage::Hello { version: "1".into() })
        );
    }

    #[test]
    fn bare_greeting_renders_without_trailing_space() {
        let hello = ServerMessage::parse(b"HELLO").unwrap();
        assert_eq!(hello, ServerMessage::Hello { version: String::new() });
        assert_eq!(hello.to_string(), "HELLO");
    }

    #[test]
    fn parse_server_replies() {
        assert_eq!(ServerMessage::parse(b"OK"), Ok(ServerMessage::Ok));
        assert_eq!(
            ServerMessage::parse(b"ERR invalid nick"),
            Ok(ServerMessage::Err { reason: "invalid nick".into() })
        );
    }

    #[test]
    fn parse_broadcast() {
        assert_eq!(
            ServerMessage::parse(b"MSG alice hi there"),
            Ok(ServerMessage::Msg { nick: "alice".into(), text: "hi there".into() })
        );
    }

    #[test]
    fn broadcast_without_text_is_malformed() {
        assert_eq!(ServerMessage::parse(b"MSG alice"), Err(ProtocolError::Malformed("MSG")));
    }

    #[test]
    fn line_len_matches_encoding() {
        let nick = Nickname::parse("alice").unwrap();
        for message in [
            ServerMessage::greeting(),
            ServerMessage::Hello { version: String::new() },
            ServerMessage::Ok,
            ServerMessage::invalid_nick(),
            ServerMessage::chat(&nick, "hi there"),
        ] {
            assert_eq!(message.line_len() + 1, message.to_bytes().len(), "{message}");
        }
    }

    #[test]
    fn chat_line_encoding() {
        let nick = Nickname::parse("alice").unwrap();
        assert_eq!(&ServerMessage::chat(&nick, "hi").to_bytes()[..], b"MSG alice hi\n");
        assert_eq!(&ServerMessage::invalid_nick().to_bytes()[..], b"ERR invalid nick\n");
    }
}
