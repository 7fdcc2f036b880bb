//! Client side of mutual authentication.

use super::{AuthProgress, AuthState, conclude, send_status_quietly};
use crate::config::AuthConfig;
use crate::error::{HandshakeError, ProofFailure, ProtocolViolation};
use crate::handoff::PeerHandoff;
use crate::key_exchange::Role;
use crate::messages::{self, Challenge, ClientHello, StatusToken};
use crate::session::PreAuthSession;
use hushlink_crypto::CryptoError;
use hushlink_crypto::constant_time::verify_32;
use hushlink_crypto::random;
use hushlink_crypto::scram::{self, KdfParams, ScramKeys};
use hushlink_transport::MessageTransport;
use zeroize::Zeroizing;

/// Reject inputs that can never authenticate, before any traffic.
///
/// # Errors
///
/// Returns [`ProtocolViolation::UsernameLength`] for an unstorable username
/// or [`CryptoError::EmptyInput`] for an empty password.
pub fn check_inputs(username: &str, password: &[u8]) -> Result<(), HandshakeError> {
    messages::check_username(username.as_bytes())?;
    if password.is_empty() {
        return Err(CryptoError::EmptyInput("password").into());
    }
    Ok(())
}

/// Authenticate as `username` over an established pre-auth session.
///
/// # Errors
///
/// - [`ProofFailure::RejectedByServer`] if the server reports `SERVER_FAIL`
///   (wrong password or unknown user, indistinguishably)
/// - [`ProofFailure::ServerSignature`] if the server cannot prove knowledge
///   of the user's server key; `CLIENT_FAIL` is sent first
/// - [`HandshakeError::NonceMismatch`] if the challenge does not echo our
///   nonce or a later message is bound to another handshake
/// - protocol, session or transport errors for anything else
pub async fn authenticate<T: MessageTransport>(
    session: PreAuthSession<T>,
    username: &str,
    password: &[u8],
    config: &AuthConfig,
) -> Result<PeerHandoff, HandshakeError> {
    let mut progress = AuthProgress::new(Role::Initiator);
    let result = run(&mut progress, session, username, password, config).await;
    conclude(&mut progress, result)
}

async fn run<T: MessageTransport>(
    progress: &mut AuthProgress,
    mut session: PreAuthSession<T>,
    username: &str,
    password: &[u8],
    config: &AuthConfig,
) -> Result<PeerHandoff, HandshakeError> {
    check_inputs(username, password)?;

    progress.transition_to(AuthState::ClientHello)?;
    let client_nonce = random::random_32()?;
    let hello = ClientHello::new(client_nonce, username)?;
    session.encrypt_and_send(&hello.encode()).await?;

    progress.transition_to(AuthState::Challenge)?;
    let challenge = Challenge::decode(&session.receive_and_decrypt().await?)?;
    let mut session = session.replace_nonce(challenge.combined, &client_nonce)?;
    let combined = *session.combined_nonce();

    progress.transition_to(AuthState::ClientProof)?;
    let keys = derive_keys(password, &challenge.salt, config.kdf).await?;
    let proof = scram::client_proof(&keys, &combined)?;
    session.send_bound(&proof).await?;

    progress.transition_to(AuthState::ServerVerify)?;
    let status = StatusToken::parse(&session.receive_bound("server status").await?)?;
    if !status.is_server_token() {
        return Err(ProtocolViolation::UnknownStatus.into());
    }
    if status == StatusToken::ServerFail {
        return Err(HandshakeError::ProofMismatch(ProofFailure::RejectedByServer));
    }

    progress.transition_to(AuthState::ServerProof)?;
    let signature =
        messages::parse_proof(&session.receive_bound("server proof").await?, "server proof")?;
    let expected = Zeroizing::new(scram::server_signature(&keys.server_key, &combined, &proof)?);
    if !verify_32(&signature, &expected) {
        send_status_quietly(&mut session, StatusToken::ClientFail).await;
        return Err(HandshakeError::ProofMismatch(ProofFailure::ServerSignature));
    }
    session.send_bound(StatusToken::ClientOk.as_bytes()).await?;

    progress.transition_to(AuthState::Authenticated)?;
    Ok(PeerHandoff::new(
        username.to_owned(),
        keys.client_key,
        keys.server_key,
    ))
}

/// Run Argon2 off the async executor.
async fn derive_keys(
    password: &[u8],
    salt: &[u8],
    params: KdfParams,
) -> Result<ScramKeys, HandshakeError> {
    let password = Zeroizing::new(password.to_vec());
    let salt = salt.to_vec();
    let salted =
        tokio::task::spawn_blocking(move || scram::salt_password(&password, &salt, &params))
            .await
            .map_err(|_| CryptoError::KeyDerivationFailed)??;
    Ok(ScramKeys::derive(&salted)?)
}
