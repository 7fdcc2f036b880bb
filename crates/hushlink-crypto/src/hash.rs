//! SHA-2 hashing, HMAC and labelled key derivation.
//!
//! Provides:
//! - SHA-256 (stored keys)
//! - SHA-512/256 (session keys)
//! - HMAC-SHA256 (SCRAM keys, signatures and decoy salts)
//! - Context-specific KDF built on SHA-512/256

use crate::CryptoError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512_256};

/// Hash output (32 bytes).
pub type HashOutput = [u8; 32];

/// Label for the pre-authentication session nonce.
pub const INITIAL_NONCE_CONTEXT: &str = "hushlink v1 initial session nonce";

/// Label for the AEAD key of the authenticated phase.
pub const PHASE_KEY_CONTEXT: &str = "hushlink v1 authenticated phase key";

/// Compute SHA-256 of input data.
#[must_use]
pub fn sha256(data: &[u8]) -> HashOutput {
    Sha256::digest(data).into()
}

/// Compute SHA-512/256 of input data.
#[must_use]
pub fn sha512_256(data: &[u8]) -> HashOutput {
    Sha512_256::digest(data).into()
}

/// Compute HMAC-SHA256 of `data` under `key`.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivationFailed`] if the MAC cannot be keyed.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<HashOutput, CryptoError> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| CryptoError::KeyDerivationFailed)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// SHA-512/256 key derivation with a context label.
///
/// Output is `SHA-512/256(len(context) ‖ context ‖ part_0 ‖ part_1 ‖ ...)`,
/// so different contexts never produce related keys from the same input.
pub struct Kdf {
    context: &'static str,
}

impl Kdf {
    /// Create a KDF with a specific context string.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let kdf = Kdf::new(PHASE_KEY_CONTEXT);
    /// let key = kdf.derive_key(&[&session_key, &combined_nonce]);
    /// ```
    #[must_use]
    pub fn new(context: &'static str) -> Self {
        Self { context }
    }

    /// Derive a 32-byte key from the concatenation of `parts`.
    #[must_use]
    pub fn derive_key(&self, parts: &[&[u8]]) -> [u8; 32] {
        let label = self.context.as_bytes();
        let mut hasher = Sha512_256::new();
        // Contexts are short constants; a single length byte is enough.
        hasher.update([label.len() as u8]);
        hasher.update(label);
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }
}
