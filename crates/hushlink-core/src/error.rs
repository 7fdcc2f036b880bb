//! Error types for the hushlink handshake.

use crate::auth::AuthState;
use hushlink_crypto::{CryptoError, CurveError};
use hushlink_transport::TransportError;
use std::path::PathBuf;
use thiserror::Error;

/// Handshake errors
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The underlying transport failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A cryptographic primitive failed or rejected its input
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The peer's key-exchange point was rejected
    #[error("key exchange error: {0}")]
    Curve(#[from] CurveError),

    /// Secure session error
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The peer sent a malformed or unexpected message
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// A message was not bound to this handshake's nonce
    #[error("handshake nonce mismatch")]
    NonceMismatch,

    /// No credential record exists for the requested user
    #[error("no credentials for the requested user")]
    CredentialNotFound,

    /// A proof or signature failed verification
    #[error("authentication failed: {0}")]
    ProofMismatch(ProofFailure),

    /// A state machine transition was attempted out of order
    #[error("invalid handshake state transition: {from:?} -> {to:?}")]
    InvalidState {
        /// State the machine was in
        from: AuthState,
        /// State that was requested
        to: AuthState,
    },
}

/// Coarse classification of handshake failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or stream failure, including timeouts
    Transport,
    /// Malformed traffic, failed decryption or a local misuse
    Protocol,
    /// Credentials or proofs were rejected
    Authentication,
}

impl HandshakeError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Crypto(_)
            | Self::Curve(_)
            | Self::Session(_)
            | Self::Protocol(_)
            | Self::InvalidState { .. } => ErrorKind::Protocol,
            Self::NonceMismatch | Self::CredentialNotFound | Self::ProofMismatch(_) => {
                ErrorKind::Authentication
            }
        }
    }
}

/// Which proof check failed, and on which side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProofFailure {
    /// Server: the client proof did not match the stored key
    #[error("client proof rejected")]
    ClientProof,

    /// Client: the server signature did not match
    #[error("server signature rejected")]
    ServerSignature,

    /// Client: the server reported that our proof was rejected
    #[error("server rejected the client proof")]
    RejectedByServer,

    /// Server: the client reported that our signature was rejected
    #[error("client rejected the server signature")]
    RejectedByClient,
}

/// Malformed or out-of-sequence handshake traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// Message shorter than its fixed part
    #[error("{message} too short: expected at least {min} bytes, got {actual}")]
    TooShort {
        /// Message name
        message: &'static str,
        /// Minimum length
        min: usize,
        /// Actual length
        actual: usize,
    },

    /// Fixed-size message or field of the wrong length
    #[error("{message} has wrong length: expected {expected} bytes, got {actual}")]
    WrongLength {
        /// Message name
        message: &'static str,
        /// Required length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Username empty or longer than 255 bytes
    #[error("username must be 1..=255 bytes, got {0}")]
    UsernameLength(usize),

    /// Username is not UTF-8
    #[error("username is not valid UTF-8")]
    UsernameEncoding,

    /// Salt shorter than Argon2 accepts
    #[error("salt must be at least {min} bytes, got {actual}")]
    SaltTooShort {
        /// Minimum salt length
        min: usize,
        /// Actual salt length
        actual: usize,
    },

    /// Status message was not one of the expected tokens
    #[error("unexpected status token")]
    UnknownStatus,
}

/// Secure session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// Ciphertext failed authentication (tampered, replayed or reordered)
    #[error("decryption failed: message authentication failure")]
    DecryptionFailed,

    /// Plaintext too large for a single transport frame
    #[error("message of {len} bytes exceeds session limit of {max}")]
    MessageTooLarge {
        /// Plaintext length
        len: usize,
        /// Largest plaintext accepted
        max: usize,
    },

    /// Per-direction message counter exhausted
    #[error("message sequence exhausted")]
    SequenceExhausted,
}

/// Credential store loading and provisioning errors
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Reading or writing the record file failed
    #[error("credential file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file has no header line
    #[error("credential file is empty; expected header")]
    MissingHeader,

    /// The header line is not the expected column list
    #[error("unexpected credential file header: {0}")]
    BadHeader(String),

    /// A record line could not be parsed
    #[error("line {line}: {reason}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// The same username appears twice
    #[error("line {line}: duplicate user {username}")]
    DuplicateUser {
        /// 1-based line number
        line: usize,
        /// Repeated username
        username: String,
    },

    /// Username cannot be stored in a record file
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Deriving the record failed
    #[error("provisioning failed: {0}")]
    Provision(#[from] CryptoError),

    /// A record could not be encoded as CSV
    #[error("record encoding failed: {0}")]
    Csv(#[from] csv::Error),
}
