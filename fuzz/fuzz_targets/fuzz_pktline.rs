//! Fuzz target for the incremental pkt-line decoder.
//!
//! The first byte picks a chunk size; the rest is fed in chunks of that size.
//! Decoding must never panic and never yield an oversized packet.

#![no_main]

use concerto_git::{Packet, PktLineDecoder, MAX_PKT_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&size, data)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(size).max(1);

    let mut decoder = PktLineDecoder::new();
    'outer: for chunk in data.chunks(chunk_size) {
        decoder.push(chunk);
        loop {
            match decoder.next_packet() {
                Ok(Some(Packet::Line(payload))) => assert!(payload.len() + 4 <= MAX_PKT_LEN),
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => break 'outer,
            }
        }
    }
});
