//! Property-based tests for nickname validation.
//!
//! Acceptance must be exactly the language `^[A-Za-z0-9_]{1,12}$`, and the
//! server's `NICK` handling must agree with it.

use linechat_proto::{ClientMessage, MAX_NICK_LEN, Nickname, ProtocolError, is_valid_nickname};
use proptest::prelude::*;

/// Reference predicate written independently of the implementation.
fn reference(candidate: &str) -> bool {
    let chars: Vec<char> = candidate.chars().collect();
    !chars.is_empty()
        && chars.len() <= MAX_NICK_LEN
        && chars.iter().all(|c| c.is_ascii_alphanumeric() || *c == '_')
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every string in the nickname language is accepted.
    #[test]
    fn prop_valid_nicknames_accepted(candidate in "[A-Za-z0-9_]{1,12}") {
        let nick = Nickname::parse(&candidate)?;
        prop_assert_eq!(nick.as_str(), candidate.as_str());
    }

    /// Names longer than the limit are rejected even with a valid charset.
    #[test]
    fn prop_long_nicknames_rejected(candidate in "[A-Za-z0-9_]{13,40}") {
        prop_assert_eq!(
            Nickname::parse(&candidate),
            Err(ProtocolError::InvalidNickname(candidate.clone()))
        );
    }

    /// Arbitrary strings are accepted exactly when the reference accepts them.
    #[test]
    fn prop_acceptance_matches_reference(candidate in any::<String>()) {
        prop_assert_eq!(is_valid_nickname(&candidate), reference(&candidate));
    }

    /// Mixed strings with spaces, punctuation and control bytes.
    #[test]
    fn prop_mixed_charset_matches_reference(candidate in r"[A-Za-z0-9_ !.\-\t\x00\x7f]{0,16}") {
        prop_assert_eq!(Nickname::parse(&candidate).is_ok(), reference(&candidate));
    }

    /// `NICK` lines carry the candidate through unchanged.
    #[test]
    fn prop_nick_line_preserves_candidate(candidate in "[ -~]{0,20}") {
        let line = format!("NICK {candidate}");
        prop_assert_eq!(ClientMessage::parse(line.as_bytes())?, ClientMessage::Nick(candidate));
    }
}
