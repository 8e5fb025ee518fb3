//! Fuzz target for line framing across arbitrary read boundaries
//!
//! # Strategy
//!
//! - Stream: arbitrary bytes, newlines included
//! - Splits: arbitrary cut points, including empty and single-byte reads
//! - Capacity: small values so overflow paths are reached often
//!
//! # Invariants
//!
//! - Feeding the stream in chunks yields the same lines as feeding it whole
//!   (when neither run overflows)
//! - Both runs overflow exactly when some line does not fit
//! - No yielded line contains a newline or exceeds the capacity
//! - The framer never buffers more than its capacity
//! - Parsing any yielded line never panics

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use linechat_proto::{ClientMessage, LineFramer, ServerMessage};

#[derive(Debug, Arbitrary)]
struct Input {
    capacity: u8,
    cuts: Vec<u16>,
    stream: Vec<u8>,
}

/// Lines yielded before the first overflow, and whether one happened.
fn run(framer: &mut LineFramer, chunks: &[&[u8]]) -> (Vec<Vec<u8>>, bool) {
    let mut lines = Vec::new();

    for chunk in chunks {
        match framer.push(chunk) {
            Ok(batch) => {
                assert!(framer.pending() <= framer.capacity(), "buffer exceeded capacity");
                lines.extend(batch.iter().map(|l| l.to_vec()));
            },
            Err(_) => return (lines, true),
        }
    }

    (lines, false)
}

fuzz_target!(|input: Input| {
    let capacity = usize::from(input.capacity).max(1);
    let stream = &input.stream[..];

    let mut cuts: Vec<usize> =
        input.cuts.iter().map(|&c| usize::from(c) % (stream.len() + 1)).collect();
    cuts.sort_unstable();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts.into_iter().chain([stream.len()]) {
        chunks.push(&stream[start..cut]);
        start = cut;
    }

    let (whole, whole_overflow) = run(&mut LineFramer::with_capacity(capacity), &[stream]);
    let (split, split_overflow) = run(&mut LineFramer::with_capacity(capacity), &chunks);

    // Reference: every newline-terminated segment, cut at the first one that
    // does not fit. The unterminated tail overflows too if it is too long.
    let mut segments: Vec<&[u8]> = stream.split(|&b| b == b'\n').collect();
    let tail = segments.pop().unwrap_or_default();
    let fitting = segments.iter().take_while(|s| s.len() <= capacity).count();
    let overflows = fitting < segments.len() || tail.len() > capacity;

    assert_eq!(whole_overflow, overflows);
    assert_eq!(split_overflow, overflows, "overflow depends on read boundaries");
    if overflows {
        // Lines completed in the overflowing read are discarded with it, so a
        // chunked run delivers a prefix of the fitting lines.
        let split: Vec<&[u8]> = split.iter().map(Vec::as_slice).collect();
        assert!(segments[..fitting].starts_with(&split));
    } else {
        assert_eq!(whole, split, "lines depend on read boundaries");
    }

    for line in &split {
        assert!(!line.contains(&b'\n'));
        assert!(line.len() <= capacity);
        let _ = ClientMessage::parse(line);
        let _ = ServerMessage::parse(line);
    }
});
