//! Ephemeral P-521 key exchange over a message transport.
//!
//! The initiator speaks first; the responder receives, computes the shared
//! secret, then answers. Points travel in the clear as uncompressed SEC1
//! encodings. They are not authenticated here; the password proofs that
//! follow are the only authentication.

use crate::error::HandshakeError;
use hushlink_crypto::SessionSecrets;
use hushlink_crypto::ecdh::{EphemeralKeyPair, PublicKey};
use hushlink_transport::MessageTransport;
use rand_core::{CryptoRng, RngCore};

/// Which side of the connection we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Client: opens the connection and speaks first
    Initiator,
    /// Server: accepts the connection and answers
    Responder,
}

impl Role {
    /// The other side.
    #[must_use]
    pub fn peer(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }

    /// True for the server side.
    #[must_use]
    pub fn is_responder(self) -> bool {
        self == Self::Responder
    }
}

/// Run the key exchange and derive the session secrets.
///
/// The ephemeral secret scalar is dropped (and zeroized) before this
/// returns, whatever the outcome.
///
/// # Errors
///
/// - [`HandshakeError::Transport`] if sending or receiving a point fails
/// - [`HandshakeError::Curve`] if our point fails validation or the peer's
///   point is malformed, on another curve, or the identity
pub async fn negotiate<T, R>(
    transport: &mut T,
    role: Role,
    rng: &mut R,
) -> Result<SessionSecrets, HandshakeError>
where
    T: MessageTransport + ?Sized,
    R: RngCore + CryptoRng,
{
    let pair = EphemeralKeyPair::generate(rng)?;
    let ours = pair.public_key().to_bytes();

    let secrets = match role {
        Role::Initiator => {
            transport.send(&ours).await?;
            let peer = PublicKey::from_sec1_bytes(&transport.receive().await?)?;
            SessionSecrets::from_shared_secret(&pair.diffie_hellman(&peer))
        }
        Role::Responder => {
            let peer = PublicKey::from_sec1_bytes(&transport.receive().await?)?;
            let secrets = SessionSecrets::from_shared_secret(&pair.diffie_hellman(&peer));
            transport.send(&ours).await?;
            secrets
        }
    };

    tracing::debug!("key exchange complete ({:?})", role);
    Ok(secrets)
}
