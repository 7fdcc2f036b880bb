//! Handshake entry points.
//!
//! [`connect`] and [`Acceptor::accept`] run the whole sequence over one
//! transport: key exchange, pre-auth session, mutual authentication. Both
//! consume the transport; on success the caller gets a [`PeerHandoff`].

use crate::auth::{self, DecoyRecords};
use crate::config::HandshakeConfig;
use crate::credentials::CredentialStore;
use crate::error::HandshakeError;
use crate::handoff::PeerHandoff;
use crate::key_exchange::{Role, negotiate};
use crate::session::PreAuthSession;
use hushlink_transport::{MessageTransport, TransportError};
use rand_core::OsRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Run the client side of the handshake.
///
/// `username` and `password` are checked before anything is sent.
///
/// # Errors
///
/// Any [`HandshakeError`]; see [`HandshakeError::kind`] for the coarse
/// classification. A missed `handshake_timeout` is reported as
/// [`TransportError::Timeout`].
pub async fn connect<T: MessageTransport>(
    mut transport: T,
    username: &str,
    password: &[u8],
    config: &HandshakeConfig,
) -> Result<PeerHandoff, HandshakeError> {
    auth::client::check_inputs(username, password)?;

    let result = with_deadline(config.handshake_timeout, async {
        let secrets = negotiate(&mut transport, Role::Initiator, &mut OsRng).await?;
        let session = PreAuthSession::new(transport, &secrets, Role::Initiator);
        auth::client::authenticate(session, username, password, &config.auth).await
    })
    .await;

    match &result {
        Ok(handoff) => tracing::info!("Authenticated to server as {}", handoff.username()),
        Err(e) => tracing::warn!("Handshake as {} failed: {}", username, e),
    }
    result
}

/// Server side of the handshake.
///
/// One acceptor serves any number of connections; it holds the credential
/// store and the key that keeps decoy salts stable for unknown users.
pub struct Acceptor {
    store: Arc<dyn CredentialStore>,
    config: HandshakeConfig,
    decoys: DecoyRecords,
}

impl Acceptor {
    /// Create an acceptor over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::Crypto`] if the decoy key cannot be drawn
    /// from the OS RNG.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        config: HandshakeConfig,
    ) -> Result<Self, HandshakeError> {
        Ok(Self {
            store,
            config,
            decoys: DecoyRecords::new()?,
        })
    }

    /// Run the server side of the handshake over `transport`.
    ///
    /// # Errors
    ///
    /// Any [`HandshakeError`]. Unknown users surface as
    /// [`HandshakeError::CredentialNotFound`] here while the client only
    /// sees a rejected proof.
    pub async fn accept<T: MessageTransport>(
        &self,
        mut transport: T,
    ) -> Result<PeerHandoff, HandshakeError> {
        let result = with_deadline(self.config.handshake_timeout, async {
            let secrets = negotiate(&mut transport, Role::Responder, &mut OsRng).await?;
            let session = PreAuthSession::new(transport, &secrets, Role::Responder);
            auth::server::authenticate(session, &*self.store, &self.decoys, &self.config.auth)
                .await
        })
        .await;

        match &result {
            Ok(handoff) => tracing::info!("Authenticated client {}", handoff.username()),
            Err(e) => tracing::warn!("Client handshake failed: {}", e),
        }
        result
    }
}

impl std::fmt::Debug for Acceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acceptor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn with_deadline<F, O>(deadline: Option<Duration>, fut: F) -> Result<O, HandshakeError>
where
    F: Future<Output = Result<O, HandshakeError>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| HandshakeError::Transport(TransportError::Timeout))?,
        None => fut.await,
    }
}
