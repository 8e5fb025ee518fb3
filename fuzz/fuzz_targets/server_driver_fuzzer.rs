//! Fuzz target for the server driver under arbitrary client traffic
//!
//! # Strategy
//!
//! - Up to 8 slots, small line capacity
//! - Operations: accept, arbitrary bytes from a slot, close, reap, break a
//!   peer's writes
//!
//! # Invariants
//!
//! - The registry never holds more connections than its capacity
//! - A refused accept leaves the live count unchanged
//! - Every registered nickname satisfies the nickname rule
//! - Every byte a peer receives forms complete, parseable server lines that a
//!   default client framer accepts
//! - After `reap_failed` no connection is marked failed

#![no_main]

use std::{cell::RefCell, io, rc::Rc};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use linechat_proto::{LineFramer, ServerMessage, is_valid_nickname};
use linechat_server::{LineSink, ServerConfig, ServerDriver};

const CAPACITY: usize = 8;

#[derive(Debug, Default)]
struct Peer {
    out: Rc<RefCell<Vec<u8>>>,
    broken: Rc<RefCell<bool>>,
}

impl LineSink for Peer {
    fn send_line(&mut self, line: &[u8]) -> io::Result<()> {
        if *self.broken.borrow() {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.out.borrow_mut().extend_from_slice(line);
        Ok(())
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Accept,
    Bytes { slot: u8, data: Vec<u8> },
    Nick { slot: u8, name: String },
    Msg { slot: u8, text: String },
    Close { slot: u8 },
    Break { slot: u8 },
    Reap,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut driver = ServerDriver::new(ServerConfig {
        max_connections: CAPACITY,
        line_capacity: 64,
        ..ServerConfig::default()
    });
    let mut outputs: Vec<Rc<RefCell<Vec<u8>>>> = Vec::new();
    let mut switches: Vec<Option<Rc<RefCell<bool>>>> = vec![None; CAPACITY];

    for op in ops {
        match op {
            Op::Accept => {
                let before = driver.registry().len();
                let peer = Peer::default();
                let out = Rc::clone(&peer.out);
                let broken = Rc::clone(&peer.broken);
                match driver.handle_connection_accepted(peer) {
                    Ok(slot) => {
                        outputs.push(out);
                        switches[slot] = Some(broken);
                    },
                    Err(_) => assert_eq!(driver.registry().len(), before),
                }
            },
            Op::Bytes { slot, data } => {
                driver.handle_bytes_received(usize::from(slot) % CAPACITY, &data);
            },
            Op::Nick { slot, name } => {
                let line = format!("NICK {}\n", name.replace('\n', ""));
                driver.handle_bytes_received(usize::from(slot) % CAPACITY, line.as_bytes());
            },
            Op::Msg { slot, text } => {
                let line = format!("MSG {}\n", text.replace('\n', ""));
                driver.handle_bytes_received(usize::from(slot) % CAPACITY, line.as_bytes());
            },
            Op::Close { slot } => {
                driver.handle_connection_closed(usize::from(slot) % CAPACITY, "fuzz");
            },
            Op::Break { slot } => {
                if let Some(Some(broken)) = switches.get(usize::from(slot) % CAPACITY) {
                    *broken.borrow_mut() = true;
                }
            },
            Op::Reap => {
                driver.reap_failed();
                assert!(driver.registry().failed_slots().is_empty());
            },
        }

        assert!(driver.registry().len() <= CAPACITY);
        for (_, conn) in driver.registry().iter() {
            if let Some(nick) = conn.nickname() {
                assert!(is_valid_nickname(nick.as_str()));
            }
        }
    }

    for out in outputs {
        let out = out.borrow();
        if out.is_empty() {
            continue;
        }
        assert_eq!(out.last(), Some(&b'\n'), "partial line written");
        assert!(LineFramer::new().push(&out).is_ok(), "line too long for a client");
        for line in out[..out.len() - 1].split(|&b| b == b'\n') {
            assert!(ServerMessage::parse(line).is_ok(), "unparseable output line");
        }
    }
});
