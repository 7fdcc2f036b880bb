//! Error types for the primitives.

use thiserror::Error;

/// Failure inside a symmetric primitive, the KDF or the RNG.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The AES-GCM seal operation refused the input
    #[error("encryption failed")]
    EncryptionFailed,

    /// Tag mismatch, wrong key or wrong nonce
    #[error("decryption failed: authentication failure")]
    DecryptionFailed,

    /// Key material of the wrong size
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required size in bytes
        expected: usize,
        /// Size supplied
        actual: usize,
    },

    /// AEAD nonce of the wrong size
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Required size in bytes
        expected: usize,
        /// Size supplied
        actual: usize,
    },

    /// Argon2 or HMAC could not produce output
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// An empty password or salt reached a derivation
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    /// KDF parameters or salt outside the accepted range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The OS CSPRNG returned an error
    #[error("random number generation failed")]
    RandomFailed,
}

/// Why a P-521 point was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CurveError {
    /// A generated or decoded point does not lie on P-521
    #[error("point is not on the P-521 curve")]
    OffCurve,

    /// The point encoding could not be parsed
    #[error("invalid point encoding")]
    InvalidEncoding,

    /// The encoding length belongs to a different curve or format
    #[error("unsupported curve or point format ({0} bytes); only uncompressed P-521 is accepted")]
    UnsupportedCurve(usize),

    /// The peer sent the point at infinity
    #[error("peer sent the point at infinity")]
    Identity,
}
