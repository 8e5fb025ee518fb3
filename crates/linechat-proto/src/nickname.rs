//! Validated nicknames.

use std::{fmt, str::FromStr};

use crate::{
    MAX_NICK_LEN,
    errors::{ProtocolError, Result},
};

/// Check a candidate nickname against `^[A-Za-z0-9_]{1,12}$`.
pub fn is_valid_nickname(candidate: &str) -> bool {
    (1..=MAX_NICK_LEN).contains(&candidate.len())
        && candidate.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A nickname that passed validation.
///
/// Holding a `Nickname` means the string is 1 to [`MAX_NICK_LEN`] ASCII
/// characters from `[A-Za-z0-9_]`. The only way to build one is
/// [`Nickname::parse`] (or [`FromStr`]), so it can be written into a
/// protocol line without further checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nickname(String);

impl Nickname {
    /// Validate and wrap a nickname.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidNickname` if the candidate is empty, longer
    ///   than [`MAX_NICK_LEN`], or contains any other character
    pub fn parse(candidate: &str) -> Result<Self> {
        if is_valid_nickname(candidate) {
            Ok(Self(candidate.to_owned()))
        } else {
            Err(ProtocolError::InvalidNickname(candidate.to_owned()))
        }
    }

    /// The nickname as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Nickname {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Nickname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Nickname {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
