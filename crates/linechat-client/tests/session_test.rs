//! Tests for the Sans-IO client session.
//!
//! The session is driven with byte slices exactly as a socket would deliver
//! them, covering the handshake, chat display rules and disconnect handling.

use bytes::Bytes;
use linechat_client::{
    ChatLine, ClientError, Nickname, Session, SessionAction, SessionEvent, SessionState,
};
use proptest::prelude::*;

fn session(nick: &str) -> Session {
    Session::new(Nickname::parse(nick).unwrap())
}

fn bytes(session: &mut Session, data: &[u8]) -> Result<Vec<SessionAction>, ClientError> {
    session.handle(SessionEvent::BytesReceived(Bytes::copy_from_slice(data)))
}

/// Session that has completed the handshake.
fn registered(nick: &str) -> Session {
    let mut session = session(nick);
    bytes(&mut session, b"HELLO 1\nOK\n").unwrap();
    assert!(session.is_registered());
    session
}

fn displayed(actions: &[SessionAction]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Display(line) => Some(line.to_string()),
            _ => None,
        })
        .collect()
}

#[test]
fn full_handshake() {
    let mut session = session("bob");
    assert_eq!(session.state(), SessionState::AwaitingGreeting);

    let actions = bytes(&mut session, b"HELLO 1\n").unwrap();
    assert!(actions.contains(&SessionAction::Send(Bytes::from_static(b"NICK bob\n"))));
    assert_eq!(session.state(), SessionState::AwaitingAck);

    let actions = bytes(&mut session, b"OK\n").unwrap();
    assert_eq!(actions, vec![SessionAction::Registered]);
    assert!(session.is_registered());
}

#[test]
fn mixed_case_greeting_is_accepted() {
    let mut session = session("bob");
    let actions = bytes(&mut session, b"Hello 1\n").unwrap();
    assert_eq!(actions[0], SessionAction::Greeted { greeting: "Hello 1".into() });
}

#[test]
fn greeting_without_version_is_kept_verbatim() {
    let mut session = session("bob");
    let actions = bytes(&mut session, b"HELLO\n").unwrap();
    assert_eq!(actions[0], SessionAction::Greeted { greeting: "HELLO".into() });
    assert_eq!(session.state(), SessionState::AwaitingAck);
}

#[test]
fn handshake_split_across_reads() {
    let mut session = session("bob");

    assert!(bytes(&mut session, b"HEL").unwrap().is_empty());
    assert_eq!(bytes(&mut session, b"LO 1\nO").unwrap().len(), 2);
    assert_eq!(bytes(&mut session, b"K\n").unwrap(), vec![SessionAction::Registered]);
}

#[test]
fn lines_after_ok_in_same_read_are_displayed() {
    let mut session = session("bob");
    bytes(&mut session, b"HELLO 1\n").unwrap();

    let actions = bytes(&mut session, b"OK\nMSG carol hi bob\n").unwrap();

    assert_eq!(actions[0], SessionAction::Registered);
    assert_eq!(displayed(&actions), vec!["carol: hi bob"]);
}

#[test]
fn rejection_ends_session() {
    let mut session = session("bob");
    bytes(&mut session, b"HELLO 1\n").unwrap();

    let err = bytes(&mut session, b"ERR invalid nick\n").unwrap_err();

    assert!(matches!(err, ClientError::Rejected(reason) if reason == "invalid nick"));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn wrong_greeting_is_unexpected() {
    let mut session = session("bob");
    let err = bytes(&mut session, b"WELCOME\n").unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedReply(line) if line == "WELCOME"));
}

#[test]
fn disconnect_during_handshake_is_an_error() {
    let mut session = session("bob");
    bytes(&mut session, b"HELLO 1\n").unwrap();

    let err = session.handle(SessionEvent::ConnectionLost).unwrap_err();
    assert!(matches!(err, ClientError::ClosedDuringHandshake));
}

#[test]
fn own_messages_are_not_displayed() {
    let mut session = registered("bob");

    let actions = bytes(&mut session, b"MSG bob hello\nMSG carol hey\nMSG bobby yo\n").unwrap();

    assert_eq!(displayed(&actions), vec!["carol: hey", "bobby: yo"]);
}

#[test]
fn unknown_and_malformed_lines_are_ignored() {
    let mut session = registered("bob");

    let actions = bytes(&mut session, b"PING\nMSG lonely\n\xff\nOK\nMSG carol ok\n").unwrap();

    assert_eq!(displayed(&actions), vec!["carol: ok"]);
}

#[test]
fn submit_encodes_msg() {
    let mut session = registered("bob");

    let actions = session.handle(SessionEvent::Submit("hi there".into())).unwrap();
    assert_eq!(actions, vec![SessionAction::Send(Bytes::from_static(b"MSG hi there\n"))]);

    let actions = session.handle(SessionEvent::Submit(String::new())).unwrap();
    assert!(actions.is_empty());
}

#[test]
fn disconnect_flushes_unterminated_tail() {
    let mut session = registered("bob");
    assert!(bytes(&mut session, b"MSG carol bye").unwrap().is_empty());

    let actions = session.handle(SessionEvent::ConnectionLost).unwrap();

    assert_eq!(actions, vec![
        SessionAction::Display(ChatLine { nick: "carol".into(), text: "bye".into() }),
        SessionAction::Closed,
    ]);
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn disconnect_without_tail_just_closes() {
    let mut session = registered("bob");
    let actions = session.handle(SessionEvent::ConnectionLost).unwrap();
    assert_eq!(actions, vec![SessionAction::Closed]);
}

#[test]
fn overlong_server_line_is_fatal() {
    let mut session = registered("bob");
    let flood = vec![b'x'; linechat_proto::MAX_LINE_LEN + 1];

    let err = bytes(&mut session, &flood).unwrap_err();

    assert!(matches!(err, ClientError::Protocol(_)));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn prop_display_is_chunking_invariant() {
    let stream: &[u8] = b"HELLO 1\nOK\nMSG carol one\nMSG bob mine\nMSG dave two words\n";
    let expected = vec!["carol: one".to_string(), "dave: two words".to_string()];

    proptest!(|(cuts in prop::collection::vec(0..stream.len(), 0..8))| {
        let mut cuts = cuts;
        cuts.sort_unstable();
        cuts.dedup();

        let mut session = session("bob");
        let mut shown = Vec::new();
        let mut start = 0;
        for cut in cuts.into_iter().chain([stream.len()]) {
            let actions = bytes(&mut session, &stream[start..cut]).unwrap();
            shown.extend(displayed(&actions));
            start = cut;
        }

        // PROPERTY: read boundaries never change what is displayed
        prop_assert_eq!(&shown, &expected);
        prop_assert!(session.is_registered());
    });
}
