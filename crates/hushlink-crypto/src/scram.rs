//! SCRAM-style key derivation and proofs.
//!
//! The password is stretched with Argon2id into a salted password, from which
//! the usual SCRAM keys are derived with HMAC-SHA256:
//!
//! ```text
//! salted      = Argon2id(password, salt, t, m, p) -> 32 bytes
//! client_key  = HMAC(salted, "Client Key")
//! server_key  = HMAC(salted, "Server Key")
//! stored_key  = SHA-256(client_key)
//!
//! client_sig  = HMAC(stored_key, combined_nonce)
//! client_proof = client_sig XOR client_key
//! auth_msg    = combined_nonce ‖ client_proof
//! server_sig  = HMAC(server_key, auth_msg)
//! ```
//!
//! The server only stores `salt`, `stored_key` and `server_key`. It recovers
//! the client key from a proof and accepts iff its SHA-256 equals the stored
//! key.

use crate::constant_time::{verify_32, xor_32};
use crate::hash::{hmac_sha256, sha256};
use crate::{COMBINED_NONCE_SIZE, CryptoError};
use argon2::{Algorithm, Argon2, Params, ParamsBuilder, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of every SCRAM key, proof and signature.
pub const KEY_SIZE: usize = 32;

/// Minimum salt length accepted by Argon2.
pub const MIN_SALT_LEN: usize = 8;

/// Size of the server signature input.
pub const AUTH_MESSAGE_SIZE: usize = COMBINED_NONCE_SIZE + KEY_SIZE;

const CLIENT_KEY_LABEL: &[u8] = b"Client Key";
const SERVER_KEY_LABEL: &[u8] = b"Server Key";

/// Argon2id cost parameters for password salting.
///
/// The defaults (t=1, m=2,000,000 KiB, p=2) are deliberately expensive;
/// client and credential file must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 2,000,000 ≈ 1.9 GiB)
    pub memory_cost_kib: u32,
    /// Number of iterations (default: 1)
    pub iterations: u32,
    /// Degree of parallelism (default: 2)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost_kib: 2_000_000,
            iterations: 1,
            parallelism: 2,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests and local experiments.
    ///
    /// **Warning:** Only use for testing. Not suitable for production.
    #[must_use]
    pub fn low_cost() -> Self {
        Self {
            memory_cost_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Validate parameters are within Argon2 bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidParameter`] describing the first
    /// violated bound.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.iterations < 1 {
            return Err(CryptoError::InvalidParameter(
                "iterations must be at least 1".into(),
            ));
        }

        if self.parallelism < 1 || self.parallelism > 255 {
            return Err(CryptoError::InvalidParameter(
                "parallelism must be between 1 and 255".into(),
            ));
        }

        // Argon2 needs 8 KiB of memory per lane
        if self.memory_cost_kib < 8 * self.parallelism {
            return Err(CryptoError::InvalidParameter(format!(
                "memory_cost_kib must be at least {} KiB for parallelism {}",
                8 * self.parallelism,
                self.parallelism
            )));
        }

        Ok(())
    }

    fn build_argon2_params(&self) -> Result<Params, CryptoError> {
        self.validate()?;

        ParamsBuilder::new()
            .m_cost(self.memory_cost_kib)
            .t_cost(self.iterations)
            .p_cost(self.parallelism)
            .output_len(KEY_SIZE)
            .build()
            .map_err(|e| CryptoError::InvalidParameter(format!("Argon2 params: {e}")))
    }
}

/// Argon2id output for a password and salt.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SaltedPassword([u8; KEY_SIZE]);

impl SaltedPassword {
    /// Wrap an existing salted password.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Stretch `password` with Argon2id.
///
/// # Errors
///
/// - [`CryptoError::EmptyInput`] for an empty password or salt, before any
///   KDF work is done
/// - [`CryptoError::InvalidParameter`] for a salt shorter than
///   [`MIN_SALT_LEN`] or out-of-range parameters
/// - [`CryptoError::KeyDerivationFailed`] if Argon2 itself fails
pub fn salt_password(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<SaltedPassword, CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::EmptyInput("password"));
    }
    if salt.is_empty() {
        return Err(CryptoError::EmptyInput("salt"));
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::InvalidParameter(format!(
            "salt must be at least {MIN_SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }

    let argon2 = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        params.build_argon2_params()?,
    );

    let mut out = SaltedPassword([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(password, salt, &mut out.0)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(out)
}

/// The three SCRAM keys derived from a salted password.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ScramKeys {
    /// `HMAC(salted, "Client Key")`
    pub client_key: [u8; KEY_SIZE],
    /// `HMAC(salted, "Server Key")`
    pub server_key: [u8; KEY_SIZE],
    /// `SHA-256(client_key)`
    pub stored_key: [u8; KEY_SIZE],
}

impl ScramKeys {
    /// Derive the client, server and stored keys.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyDerivationFailed`] if HMAC keying fails.
    pub fn derive(salted: &SaltedPassword) -> Result<Self, CryptoError> {
        let client_key = hmac_sha256(salted.as_bytes(), CLIENT_KEY_LABEL)?;
        let server_key = hmac_sha256(salted.as_bytes(), SERVER_KEY_LABEL)?;
        let stored_key = sha256(&client_key);
        Ok(Self {
            client_key,
            server_key,
            stored_key,
        })
    }
}

/// `HMAC(stored_key, combined_nonce)`.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivationFailed`] if HMAC keying fails.
pub fn client_signature(
    stored_key: &[u8; KEY_SIZE],
    combined: &[u8; COMBINED_NONCE_SIZE],
) -> Result<[u8; KEY_SIZE], CryptoError> {
    hmac_sha256(stored_key, combined)
}

/// Blind the client key with the client signature.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivationFailed`] if HMAC keying fails.
pub fn client_proof(
    keys: &ScramKeys,
    combined: &[u8; COMBINED_NONCE_SIZE],
) -> Result<[u8; KEY_SIZE], CryptoError> {
    let signature = Zeroizing::new(client_signature(&keys.stored_key, combined)?);
    Ok(xor_32(&signature, &keys.client_key))
}

/// Recover the client key a proof was built from.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivationFailed`] if HMAC keying fails.
pub fn recover_client_key(
    proof: &[u8; KEY_SIZE],
    stored_key: &[u8; KEY_SIZE],
    combined: &[u8; COMBINED_NONCE_SIZE],
) -> Result<Zeroizing<[u8; KEY_SIZE]>, CryptoError> {
    let signature = Zeroizing::new(client_signature(stored_key, combined)?);
    Ok(Zeroizing::new(xor_32(&signature, proof)))
}

/// Constant-time check that `SHA-256(client_key) == stored_key`.
#[must_use]
pub fn stored_key_matches(client_key: &[u8; KEY_SIZE], stored_key: &[u8; KEY_SIZE]) -> bool {
    verify_32(&sha256(client_key), stored_key)
}

/// `combined_nonce ‖ client_proof`.
#[must_use]
pub fn auth_message(
    combined: &[u8; COMBINED_NONCE_SIZE],
    proof: &[u8; KEY_SIZE],
) -> [u8; AUTH_MESSAGE_SIZE] {
    let mut msg = [0u8; AUTH_MESSAGE_SIZE];
    msg[..COMBINED_NONCE_SIZE].copy_from_slice(combined);
    msg[COMBINED_NONCE_SIZE..].copy_from_slice(proof);
    msg
}

/// `HMAC(server_key, combined_nonce ‖ client_proof)`.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivationFailed`] if HMAC keying fails.
pub fn server_signature(
    server_key: &[u8; KEY_SIZE],
    combined: &[u8; COMBINED_NONCE_SIZE],
    proof: &[u8; KEY_SIZE],
) -> Result<[u8; KEY_SIZE], CryptoError> {
    hmac_sha256(server_key, &auth_message(combined, proof))
}
