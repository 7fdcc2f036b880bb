//! Fuzz test for AEAD decryption
//!
//! Forged ciphertexts must be rejected; nothing decrypts without the tag.

#![no_main]

use arbitrary::Arbitrary;
use hushlink_crypto::aead::{AeadKey, Nonce};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    key: [u8; 32],
    iv: [u8; 12],
    responder: bool,
    sequence: u64,
    ciphertext: Vec<u8>,
    aad: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let key = AeadKey::new(input.key);
    let nonce = Nonce::sequenced(&input.iv, input.responder, input.sequence);

    // A random forgery verifying would mean the tag check is broken
    assert!(key.decrypt(&nonce, &input.ciphertext, &input.aad).is_err());

    if let Ok(sealed) = key.encrypt(&nonce, &input.ciphertext, &input.aad) {
        let opened = key.decrypt(&nonce, &sealed, &input.aad);
        assert_eq!(opened.ok().as_deref(), Some(&input.ciphertext[..]));
    }
});
