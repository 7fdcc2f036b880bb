//! Fuzz test for handshake message parsers
//!
//! Covers every decoder that sees peer-controlled plaintext, plus the
//! key-exchange point decoder.

#![no_main]

use hushlink_core::messages::{self, Challenge, ClientHello, StatusToken};
use hushlink_crypto::ecdh::PublicKey;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(hello) = ClientHello::decode(data) {
        // Anything accepted must re-encode to the same bytes
        assert_eq!(hello.encode(), data);
    }

    if let Ok(challenge) = Challenge::decode(data) {
        assert_eq!(challenge.encode(), data);
    }

    if let Ok((combined, body)) = messages::split_bound(data, "fuzz") {
        assert_eq!(messages::bind(&combined, body), data);
        let _ = messages::parse_proof(body, "fuzz");
        let _ = StatusToken::parse(body);
    }

    let _ = PublicKey::from_sec1_bytes(data);
});
