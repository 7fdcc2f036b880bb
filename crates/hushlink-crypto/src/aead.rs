//! AES-256-GCM AEAD encryption.
//!
//! Every handshake message after key exchange is sealed with AES-256-GCM
//! (256-bit key, 96-bit nonce, 16-byte tag appended to the ciphertext).
//!
//! ## Nonce discipline
//!
//! GCM fails catastrophically on nonce reuse, so session traffic never uses a
//! caller-chosen nonce directly. [`Nonce::sequenced`] mixes the sender's role
//! and a per-direction message sequence into a per-session IV, which makes
//! every (key, nonce) pair unique for the lifetime of a key.
//!
//! ## Usage
//!
//! ```ignore
//! use hushlink_crypto::aead::{AeadKey, Nonce};
//!
//! let key = AeadKey::new(session_key);
//! let nonce = Nonce::sequenced(&iv, false, 0);
//!
//! let ciphertext = key.encrypt(&nonce, b"secret", b"")?;
//! let plaintext = key.decrypt(&nonce, &ciphertext, b"")?;
//! ```

use crate::CryptoError;
use aes_gcm::{
    Aes256Gcm,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bytes appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// Bytes in a GCM nonce.
pub const NONCE_SIZE: usize = 12;

/// Bytes in an AES-256 key.
pub const KEY_SIZE: usize = 32;

/// Bit flipped in the first nonce byte for messages sent by the responder.
const RESPONDER_LANE: u8 = 0x80;

/// 96-bit GCM nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Wrap a fixed nonce.
    #[must_use]
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy a nonce out of a message buffer.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidNonceLength` unless the slice is 12 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        <[u8; NONCE_SIZE]>::try_from(slice)
            .map(Self)
            .map_err(|_| CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: slice.len(),
            })
    }

    /// Build the nonce for one message of a session.
    ///
    /// `iv` is the first 96 bits of the session nonce. The top bit of byte 0
    /// selects the sending side and the big-endian `sequence` is XORed into
    /// bytes 4..12, so the two directions never collide and a sequence
    /// number is never reused within a direction.
    #[must_use]
    pub fn sequenced(iv: &[u8; NONCE_SIZE], responder: bool, sequence: u64) -> Self {
        let mut bytes = *iv;
        if responder {
            bytes[0] ^= RESPONDER_LANE;
        }
        for (b, s) in bytes[4..].iter_mut().zip(sequence.to_be_bytes()) {
            *b ^= s;
        }
        Self(bytes)
    }

    /// Nonce bytes as passed to the cipher.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    fn as_generic(&self) -> &aes_gcm::Nonce<aes_gcm::aead::consts::U12> {
        aes_gcm::Nonce::from_slice(&self.0)
    }
}

/// AES-256-GCM key, wiped when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AeadKey([u8; KEY_SIZE]);

impl AeadKey {
    /// Take ownership of derived key bytes.
    #[must_use]
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a buffer.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` unless the slice is 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        <[u8; KEY_SIZE]>::try_from(slice)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: slice.len(),
            })
    }

    /// Raw key material. Never log or persist it.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Seal `plaintext`, returning `ciphertext ‖ tag`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EncryptionFailed` if the cipher refuses the input.
    pub fn encrypt(
        &self,
        nonce: &Nonce,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new((&self.0).into());

        cipher
            .encrypt(
                nonce.as_generic(),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    /// Open `ciphertext ‖ tag` sealed under the same key, nonce and `aad`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` if the tag does not verify
    /// or the input is shorter than a tag.
    pub fn decrypt(
        &self,
        nonce: &Nonce,
        ciphertext_and_tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if ciphertext_and_tag.len() < TAG_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }

        let cipher = Aes256Gcm::new((&self.0).into());

        cipher
            .decrypt(
                nonce.as_generic(),
                Payload {
                    msg: ciphertext_and_tag,
                    aad,
                },
            )
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}
