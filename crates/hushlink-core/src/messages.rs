//! Handshake wire messages.
//!
//! All messages travel encrypted inside the secure session. Layouts:
//!
//! ```text
//! ClientHello   = client_nonce(32) ‖ username(1..=255, UTF-8)
//! Challenge     = client_nonce(32) ‖ server_nonce(32) ‖ salt(>= 8)
//! ClientProof   = combined(64) ‖ client_proof(32)
//! ServerStatus  = combined(64) ‖ "SERVER_OK" | "SERVER_FAIL"
//! ServerProof   = combined(64) ‖ server_signature(32)
//! ClientStatus  = combined(64) ‖ "CLIENT_OK" | "CLIENT_FAIL"
//! ```
//!
//! Messages after the challenge are "bound": prefixed with the combined
//! nonce. [`bind`] and [`split_bound`] handle the prefix; the body parsers
//! below validate what follows it.

use crate::MAX_USERNAME_LEN;
use crate::error::ProtocolViolation;
use hushlink_crypto::scram::{KEY_SIZE, MIN_SALT_LEN};
use hushlink_crypto::{COMBINED_NONCE_SIZE, HANDSHAKE_NONCE_SIZE};

/// Combined client/server nonce.
pub type CombinedNonce = [u8; COMBINED_NONCE_SIZE];

/// One party's handshake nonce.
pub type HandshakeNonce = [u8; HANDSHAKE_NONCE_SIZE];

/// `client_nonce ‖ server_nonce`.
#[must_use]
pub fn combine(client_nonce: &HandshakeNonce, server_nonce: &HandshakeNonce) -> CombinedNonce {
    let mut combined = [0u8; COMBINED_NONCE_SIZE];
    combined[..HANDSHAKE_NONCE_SIZE].copy_from_slice(client_nonce);
    combined[HANDSHAKE_NONCE_SIZE..].copy_from_slice(server_nonce);
    combined
}

pub(crate) fn check_username(username: &[u8]) -> Result<(), ProtocolViolation> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ProtocolViolation::UsernameLength(username.len()));
    }
    Ok(())
}

/// First message: the client's nonce and the user it claims to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// Fresh client nonce
    pub client_nonce: HandshakeNonce,
    /// Claimed username
    pub username: String,
}

impl ClientHello {
    /// Build a hello, validating the username length.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::UsernameLength`] for an empty username or
    /// one longer than 255 bytes.
    pub fn new(client_nonce: HandshakeNonce, username: &str) -> Result<Self, ProtocolViolation> {
        check_username(username.as_bytes())?;
        Ok(Self {
            client_nonce,
            username: username.to_owned(),
        })
    }

    /// Serialize to wire format.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HANDSHAKE_NONCE_SIZE + self.username.len());
        out.extend_from_slice(&self.client_nonce);
        out.extend_from_slice(self.username.as_bytes());
        out
    }

    /// Parse from wire format.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolViolation`] if the message is too short, or the
    /// username is empty, too long or not UTF-8.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolViolation> {
        if bytes.len() < HANDSHAKE_NONCE_SIZE + 1 {
            return Err(ProtocolViolation::TooShort {
                message: "client hello",
                min: HANDSHAKE_NONCE_SIZE + 1,
                actual: bytes.len(),
            });
        }
        let (nonce, name) = bytes.split_at(HANDSHAKE_NONCE_SIZE);
        check_username(name)?;

        let username = std::str::from_utf8(name)
            .map_err(|_| ProtocolViolation::UsernameEncoding)?
            .to_owned();
        let mut client_nonce = [0u8; HANDSHAKE_NONCE_SIZE];
        client_nonce.copy_from_slice(nonce);

        Ok(Self {
            client_nonce,
            username,
        })
    }
}

/// Second message: the combined nonce and the user's salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// `client_nonce ‖ server_nonce`
    pub combined: CombinedNonce,
    /// Argon2 salt for the claimed user
    pub salt: Vec<u8>,
}

impl Challenge {
    /// The echoed client nonce.
    #[must_use]
    pub fn client_nonce(&self) -> &[u8] {
        &self.combined[..HANDSHAKE_NONCE_SIZE]
    }

    /// The server's nonce.
    #[must_use]
    pub fn server_nonce(&self) -> &[u8] {
        &self.combined[HANDSHAKE_NONCE_SIZE..]
    }

    /// Serialize to wire format.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        bind(&self.combined, &self.salt)
    }

    /// Parse from wire format.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolViolation`] if the nonce is incomplete or the salt
    /// is shorter than Argon2 accepts.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolViolation> {
        let (combined, salt) = split_bound(bytes, "challenge")?;
        if salt.len() < MIN_SALT_LEN {
            return Err(ProtocolViolation::SaltTooShort {
                min: MIN_SALT_LEN,
                actual: salt.len(),
            });
        }
        Ok(Self {
            combined,
            salt: salt.to_vec(),
        })
    }
}

/// Prefix `body` with the combined nonce.
#[must_use]
pub fn bind(combined: &CombinedNonce, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(COMBINED_NONCE_SIZE + body.len());
    out.extend_from_slice(combined);
    out.extend_from_slice(body);
    out
}

/// Split a bound message into its nonce prefix and body.
///
/// The prefix is returned for the caller to compare; this function does not
/// judge it.
///
/// # Errors
///
/// Returns [`ProtocolViolation::TooShort`] if fewer than 64 bytes arrived.
pub fn split_bound<'a>(
    bytes: &'a [u8],
    message: &'static str,
) -> Result<(CombinedNonce, &'a [u8]), ProtocolViolation> {
    if bytes.len() < COMBINED_NONCE_SIZE {
        return Err(ProtocolViolation::TooShort {
            message,
            min: COMBINED_NONCE_SIZE,
            actual: bytes.len(),
        });
    }
    let (prefix, body) = bytes.split_at(COMBINED_NONCE_SIZE);
    let mut combined = [0u8; COMBINED_NONCE_SIZE];
    combined.copy_from_slice(prefix);
    Ok((combined, body))
}

/// Parse a 32-byte proof or signature body.
///
/// # Errors
///
/// Returns [`ProtocolViolation::WrongLength`] unless `body` is exactly 32
/// bytes.
pub fn parse_proof(body: &[u8], message: &'static str) -> Result<[u8; KEY_SIZE], ProtocolViolation> {
    <[u8; KEY_SIZE]>::try_from(body).map_err(|_| ProtocolViolation::WrongLength {
        message,
        expected: KEY_SIZE,
        actual: body.len(),
    })
}

/// Verdict tokens exchanged after each proof check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusToken {
    /// Server accepted the client proof
    ServerOk,
    /// Server rejected the client proof
    ServerFail,
    /// Client accepted the server signature
    ClientOk,
    /// Client rejected the server signature
    ClientFail,
}

impl StatusToken {
    /// Token bytes as sent on the wire.
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::ServerOk => b"SERVER_OK",
            Self::ServerFail => b"SERVER_FAIL",
            Self::ClientOk => b"CLIENT_OK",
            Self::ClientFail => b"CLIENT_FAIL",
        }
    }

    /// Parse a status body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::UnknownStatus`] for anything but the four
    /// exact tokens.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolViolation> {
        [Self::ServerOk, Self::ServerFail, Self::ClientOk, Self::ClientFail]
            .into_iter()
            .find(|token| token.as_bytes() == body)
            .ok_or(ProtocolViolation::UnknownStatus)
    }

    /// True for tokens the server sends.
    #[must_use]
    pub fn is_server_token(self) -> bool {
        matches!(self, Self::ServerOk | Self::ServerFail)
    }
}
