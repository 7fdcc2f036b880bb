//! Server side of mutual authentication.

use super::{AuthProgress, AuthState, conclude, send_status_quietly};
use crate::config::AuthConfig;
use crate::credentials::{CredentialRecord, CredentialStore};
use crate::error::{HandshakeError, ProofFailure, ProtocolViolation};
use crate::handoff::PeerHandoff;
use crate::key_exchange::Role;
use crate::messages::{self, Challenge, ClientHello, StatusToken};
use crate::session::PreAuthSession;
use hushlink_crypto::CryptoError;
use hushlink_crypto::hash::hmac_sha256;
use hushlink_crypto::random;
use hushlink_crypto::scram;
use hushlink_transport::MessageTransport;
use zeroize::Zeroizing;

const DECOY_SALT_LABEL: &[u8] = b"hushlink decoy salt";

/// Stand-in records for users the store does not know.
///
/// The salt is keyed on the username so repeated probes for one name see
/// the same challenge salt. The keys are fresh random values, so no proof
/// can ever verify against them.
pub struct DecoyRecords {
    key: Zeroizing<[u8; 32]>,
}

impl DecoyRecords {
    /// Create with a random key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomFailed`] if the OS RNG fails.
    pub fn new() -> Result<Self, CryptoError> {
        Ok(Self::from_key(random::random_32()?))
    }

    /// Create with a fixed key.
    #[must_use]
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Decoy record for `username`.
    ///
    /// # Errors
    ///
    /// Returns a [`CryptoError`] if HMAC keying or the OS RNG fails.
    pub fn record_for(&self, username: &str) -> Result<CredentialRecord, CryptoError> {
        let mut input = Vec::with_capacity(DECOY_SALT_LABEL.len() + username.len());
        input.extend_from_slice(DECOY_SALT_LABEL);
        input.extend_from_slice(username.as_bytes());

        Ok(CredentialRecord {
            salt: hmac_sha256(&self.key[..], &input)?.to_vec(),
            stored_key: random::random_32()?,
            server_key: random::random_32()?,
        })
    }
}

/// Authenticate a client over an established pre-auth session.
///
/// # Errors
///
/// - [`HandshakeError::CredentialNotFound`] for an unknown user. With
///   `conceal_unknown_users` the full exchange runs against a decoy record
///   and the client only sees `SERVER_FAIL`; without it the handshake stops
///   right after the lookup.
/// - [`ProofFailure::ClientProof`] if the proof does not match the stored
///   key; `SERVER_FAIL` is sent first
/// - [`ProofFailure::RejectedByClient`] if the client refuses our signature
/// - [`HandshakeError::NonceMismatch`] if a proof is bound to another
///   handshake, including a replayed one
/// - protocol, session or transport errors for anything else
pub async fn authenticate<T: MessageTransport>(
    session: PreAuthSession<T>,
    store: &dyn CredentialStore,
    decoys: &DecoyRecords,
    config: &AuthConfig,
) -> Result<PeerHandoff, HandshakeError> {
    let mut progress = AuthProgress::new(Role::Responder);
    let result = run(&mut progress, session, store, decoys, config).await;
    conclude(&mut progress, result)
}

async fn run<T: MessageTransport>(
    progress: &mut AuthProgress,
    mut session: PreAuthSession<T>,
    store: &dyn CredentialStore,
    decoys: &DecoyRecords,
    config: &AuthConfig,
) -> Result<PeerHandoff, HandshakeError> {
    progress.transition_to(AuthState::ClientHello)?;
    let hello = ClientHello::decode(&session.receive_and_decrypt().await?)?;
    let (record, known) = match store.lookup(&hello.username) {
        Some(record) => (record, true),
        None if config.conceal_unknown_users => {
            tracing::debug!("Unknown user {:?}, answering with a decoy", hello.username);
            (decoys.record_for(&hello.username)?, false)
        }
        None => return Err(HandshakeError::CredentialNotFound),
    };

    progress.transition_to(AuthState::Challenge)?;
    let server_nonce = random::random_32()?;
    let combined = messages::combine(&hello.client_nonce, &server_nonce);
    let challenge = Challenge {
        combined,
        salt: record.salt.clone(),
    };
    session.encrypt_and_send(&challenge.encode()).await?;
    let mut session = session.replace_nonce(combined, &hello.client_nonce)?;

    progress.transition_to(AuthState::ClientProof)?;
    let proof =
        messages::parse_proof(&session.receive_bound("client proof").await?, "client proof")?;

    progress.transition_to(AuthState::ServerVerify)?;
    let client_key = scram::recover_client_key(&proof, &record.stored_key, &combined)?;
    if !(scram::stored_key_matches(&client_key, &record.stored_key) & known) {
        send_status_quietly(&mut session, StatusToken::ServerFail).await;
        return Err(if known {
            HandshakeError::ProofMismatch(ProofFailure::ClientProof)
        } else {
            HandshakeError::CredentialNotFound
        });
    }
    session.send_bound(StatusToken::ServerOk.as_bytes()).await?;

    progress.transition_to(AuthState::ServerProof)?;
    let signature = Zeroizing::new(scram::server_signature(
        &record.server_key,
        &combined,
        &proof,
    )?);
    session.send_bound(&signature[..]).await?;
    let status = StatusToken::parse(&session.receive_bound("client status").await?)?;
    if status.is_server_token() {
        return Err(ProtocolViolation::UnknownStatus.into());
    }
    if status == StatusToken::ClientFail {
        return Err(HandshakeError::ProofMismatch(ProofFailure::RejectedByClient));
    }

    progress.transition_to(AuthState::Authenticated)?;
    Ok(PeerHandoff::new(
        hello.username,
        *client_key,
        record.server_key,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::key_exchange::negotiate;
    use crate::session::AuthSession;
    use hushlink_crypto::scram::{KdfParams, ScramKeys};
    use hushlink_transport::{FramedTransport, TransportConfig};
    use rand_core::OsRng;
    use tokio::io::{DuplexStream, duplex};

    type Duplex = FramedTransport<DuplexStream>;

    const SALT: [u8; 16] = [3u8; 16];

    async fn sessions() -> (PreAuthSession<Duplex>, PreAuthSession<Duplex>) {
        let (a, b) = duplex(64 * 1024);
        let mut client = FramedTransport::new(a, TransportConfig::default());
        let mut server = FramedTransport::new(b, TransportConfig::default());
        let mut rng0 = OsRng;
        let mut rng1 = OsRng;
        let (c, s) = tokio::join!(
            negotiate(&mut client, Role::Initiator, &mut rng0),
            negotiate(&mut server, Role::Responder, &mut rng1),
        );
        (
            PreAuthSession::new(client, &c.unwrap(), Role::Initiator),
            PreAuthSession::new(server, &s.unwrap(), Role::Responder),
        )
    }

    fn store() -> MemoryCredentialStore {
        let provisioned =
            CredentialRecord::provision(b"alicespass", &SALT, &KdfParams::low_cost()).unwrap();
        MemoryCredentialStore::new().with_record("alice", provisioned.record.clone())
    }

    fn keys(password: &[u8]) -> ScramKeys {
        let salted = scram::salt_password(password, &SALT, &KdfParams::low_cost()).unwrap();
        ScramKeys::derive(&salted).unwrap()
    }

    /// Send a hello and return the bound session plus the challenge.
    async fn hello(
        mut client: PreAuthSession<Duplex>,
        username: &str,
    ) -> (AuthSession<Duplex>, Challenge) {
        let nonce = random::random_32().unwrap();
        let hello = ClientHello::new(nonce, username).unwrap();
        client.encrypt_and_send(&hello.encode()).await.unwrap();
        let challenge = Challenge::decode(&client.receive_and_decrypt().await.unwrap()).unwrap();
        let session = client.replace_nonce(challenge.combined, &nonce).unwrap();
        (session, challenge)
    }

    #[test]
    fn test_decoy_salt_is_stable_per_name() {
        let decoys = DecoyRecords::from_key([1u8; 32]);
        let a = decoys.record_for("mallory").unwrap();
        let b = decoys.record_for("mallory").unwrap();
        let c = decoys.record_for("trent").unwrap();

        assert_eq!(a.salt, b.salt);
        assert_ne!(a.salt, c.salt);
        assert_eq!(a.salt.len(), 32);
        assert_ne!(a.stored_key, b.stored_key);

        let other = DecoyRecords::from_key([2u8; 32]).record_for("mallory").unwrap();
        assert_ne!(a.salt, other.salt);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (client, server) = sessions().await;
        let store = store();
        let decoys = DecoyRecords::new().unwrap();
        let config = AuthConfig::default();

        let client = async {
            let (mut session, _) = hello(client, "alice").await;
            let proof = scram::client_proof(&keys(b"wrong"), session.combined_nonce()).unwrap();
            session.send_bound(&proof).await.unwrap();
            session.receive_bound("server status").await.unwrap()
        };
        let (status, result) =
            tokio::join!(client, authenticate(server, &store, &decoys, &config));

        assert_eq!(status, StatusToken::ServerFail.as_bytes());
        assert!(matches!(
            result,
            Err(HandshakeError::ProofMismatch(ProofFailure::ClientProof))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_gets_decoy_challenge() {
        let (client, server) = sessions().await;
        let store = store();
        let decoys = DecoyRecords::from_key([4u8; 32]);
        let config = AuthConfig::default();

        let client = async {
            let (mut session, challenge) = hello(client, "mallory").await;
            let proof = scram::client_proof(&keys(b"guess"), session.combined_nonce()).unwrap();
            session.send_bound(&proof).await.unwrap();
            (challenge, session.receive_bound("server status").await.unwrap())
        };
        let ((challenge, status), result) =
            tokio::join!(client, authenticate(server, &store, &decoys, &config));

        assert_eq!(challenge.salt, decoys.record_for("mallory").unwrap().salt);
        assert_eq!(status, StatusToken::ServerFail.as_bytes());
        assert!(matches!(result, Err(HandshakeError::CredentialNotFound)));
    }

    #[tokio::test]
    async fn test_unknown_user_without_concealment() {
        let (mut client, server) = sessions().await;
        let store = store();
        let decoys = DecoyRecords::new().unwrap();
        let config = AuthConfig {
            conceal_unknown_users: false,
            ..AuthConfig::default()
        };

        let hello = ClientHello::new([5u8; 32], "mallory").unwrap();
        client.encrypt_and_send(&hello.encode()).await.unwrap();

        let result = authenticate(server, &store, &decoys, &config).await;
        assert!(matches!(result, Err(HandshakeError::CredentialNotFound)));
        // No challenge follows
        assert!(client.receive_and_decrypt().await.is_err());
    }

    #[tokio::test]
    async fn test_client_rejects_signature() {
        let (client, server) = sessions().await;
        let store = store();
        let decoys = DecoyRecords::new().unwrap();
        let config = AuthConfig::default();

        let client = async {
            let (mut session, _) = hello(client, "alice").await;
            let proof = scram::client_proof(&keys(b"alicespass"), session.combined_nonce()).unwrap();
            session.send_bound(&proof).await.unwrap();
            session.receive_bound("server status").await.unwrap();
            session.receive_bound("server proof").await.unwrap();
            session
                .send_bound(StatusToken::ClientFail.as_bytes())
                .await
                .unwrap();
        };
        let (_, result) = tokio::join!(client, authenticate(server, &store, &decoys, &config));
        assert!(matches!(
            result,
            Err(HandshakeError::ProofMismatch(ProofFailure::RejectedByClient))
        ));
    }

    #[tokio::test]
    async fn test_server_token_from_client_is_violation() {
        let (client, server) = sessions().await;
        let store = store();
        let decoys = DecoyRecords::new().unwrap();
        let config = AuthConfig::default();

        let client = async {
            let (mut session, _) = hello(client, "alice").await;
            let proof = scram::client_proof(&keys(b"alicespass"), session.combined_nonce()).unwrap();
            session.send_bound(&proof).await.unwrap();
            session.receive_bound("server status").await.unwrap();
            session.receive_bound("server proof").await.unwrap();
            session
                .send_bound(StatusToken::ServerOk.as_bytes())
                .await
                .unwrap();
        };
        let (_, result) = tokio::join!(client, authenticate(server, &store, &decoys, &config));
        assert!(matches!(
            result,
            Err(HandshakeError::Protocol(ProtocolViolation::UnknownStatus))
        ));
    }

    #[tokio::test]
    async fn test_short_proof_is_violation() {
        let (client, server) = sessions().await;
        let store = store();
        let decoys = DecoyRecords::new().unwrap();
        let config = AuthConfig::default();

        let client = async {
            let (mut session, _) = hello(client, "alice").await;
            session.send_bound(&[0u8; 31]).await.unwrap();
            session
        };
        let (_session, result) =
            tokio::join!(client, authenticate(server, &store, &decoys, &config));
        assert!(matches!(
            result,
            Err(HandshakeError::Protocol(ProtocolViolation::WrongLength { .. }))
        ));
    }
}
