//! Fuzz test for the length-prefixed frame decoder
//!
//! Arbitrary bytes must decode to a frame inside the buffer or a framing
//! error, never a panic or an out-of-range slice.

#![no_main]

use hushlink_transport::LENGTH_PREFIX_SIZE;
use hushlink_transport::framed::decode_frame;
use libfuzzer_sys::fuzz_target;

const MAX_FRAME_LEN: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let mut rest = data;
    while let Ok((payload, consumed)) = decode_frame(rest, MAX_FRAME_LEN) {
        assert!(payload.len() <= MAX_FRAME_LEN);
        assert_eq!(consumed, LENGTH_PREFIX_SIZE + payload.len());
        rest = &rest[consumed..];
    }
});
