//! # hushlink Crypto
//!
//! Cryptographic primitives for the hushlink handshake.
//!
//! This crate provides:
//! - Ephemeral ECDH on NIST P-521
//! - AES-256-GCM authenticated encryption with sequenced nonces
//! - SHA-2 hashing and labelled key derivation
//! - SCRAM-style key derivation (Argon2id + HMAC-SHA256)
//! - Constant-time comparison helpers
//! - Secure random number generation
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Security Level |
//! |----------|-----------|----------------|
//! | Key Exchange | ECDH P-521 | 256-bit |
//! | AEAD | AES-256-GCM | 256-bit key |
//! | Session Key | SHA-512/256 | 128-bit collision |
//! | Password KDF | Argon2id | memory-hard |
//! | Proofs | HMAC-SHA256 | 256-bit |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod aead;
pub mod constant_time;
pub mod ecdh;
pub mod error;
pub mod hash;
pub mod random;
pub mod scram;

pub use error::{CryptoError, CurveError};

/// Session key size (AES-256).
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of each party's handshake nonce.
pub const HANDSHAKE_NONCE_SIZE: usize = 32;

/// Size of the combined client/server nonce.
pub const COMBINED_NONCE_SIZE: usize = 2 * HANDSHAKE_NONCE_SIZE;

/// Session secrets produced by the key exchange.
///
/// Both parties derive identical values from the ECDHE shared secret.
#[derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct SessionSecrets {
    /// AES-256-GCM key for the pre-authentication phase
    pub session_key: [u8; SESSION_KEY_SIZE],
    /// Nonce used until the combined handshake nonce is installed
    pub initial_nonce: [u8; HANDSHAKE_NONCE_SIZE],
}

impl SessionSecrets {
    /// Derive the session secrets from an ECDHE shared secret.
    ///
    /// The session key is `SHA-512/256(x)` where `x` is the encoded shared
    /// x-coordinate. The initial nonce uses the same input under a separate
    /// derivation label.
    #[must_use]
    pub fn from_shared_secret(shared: &ecdh::SharedSecret) -> Self {
        Self {
            session_key: hash::sha512_256(shared.as_bytes()),
            initial_nonce: hash::Kdf::new(hash::INITIAL_NONCE_CONTEXT)
                .derive_key(&[shared.as_bytes()]),
        }
    }
}
