//! Two-phase secure session.
//!
//! ```text
//!   PreAuthSession ──replace_nonce(combined)──> AuthSession
//!   key = session_key                            key = KDF(session_key ‖ combined)
//!   iv  = initial_nonce[..12]                    iv  = combined[..12]
//! ```
//!
//! The nonce swap consumes the pre-authentication handle, so it can happen
//! at most once. Every message is sealed with AES-256-GCM under
//! [`Nonce::sequenced`]: the sender's role and a per-direction counter are
//! mixed into the phase IV, so no (key, nonce) pair repeats. The receiver
//! tracks the peer's counter, which turns replays and reordering into
//! authentication failures.

use crate::error::{HandshakeError, SessionError};
use crate::key_exchange::Role;
use crate::messages::{self, CombinedNonce, HandshakeNonce};
use hushlink_crypto::aead::{self, AeadKey, Nonce};
use hushlink_crypto::constant_time::{verify_32, verify_64};
use hushlink_crypto::hash::{Kdf, PHASE_KEY_CONTEXT};
use hushlink_crypto::{HANDSHAKE_NONCE_SIZE, SESSION_KEY_SIZE, SessionSecrets};
use hushlink_transport::MessageTransport;
use zeroize::Zeroizing;

/// AEAD state for one phase of a connection.
struct Channel<T> {
    transport: T,
    key: AeadKey,
    iv: [u8; aead::NONCE_SIZE],
    role: Role,
    send_seq: u64,
    recv_seq: u64,
}

fn iv_from(nonce: &[u8]) -> [u8; aead::NONCE_SIZE] {
    let mut iv = [0u8; aead::NONCE_SIZE];
    iv.copy_from_slice(&nonce[..aead::NONCE_SIZE]);
    iv
}

fn next(seq: &mut u64) -> Result<u64, SessionError> {
    let current = *seq;
    *seq = current.checked_add(1).ok_or(SessionError::SequenceExhausted)?;
    Ok(current)
}

impl<T: MessageTransport> Channel<T> {
    fn new(transport: T, key: AeadKey, iv: [u8; aead::NONCE_SIZE], role: Role) -> Self {
        Self {
            transport,
            key,
            iv,
            role,
            send_seq: 0,
            recv_seq: 0,
        }
    }

    fn max_plaintext_len(&self) -> usize {
        self.transport
            .max_payload_len()
            .saturating_sub(aead::TAG_SIZE)
    }

    async fn seal_and_send(&mut self, plaintext: &[u8]) -> Result<usize, HandshakeError> {
        let max = self.max_plaintext_len();
        if plaintext.len() > max {
            return Err(SessionError::MessageTooLarge {
                len: plaintext.len(),
                max,
            }
            .into());
        }

        let seq = next(&mut self.send_seq)?;
        let nonce = Nonce::sequenced(&self.iv, self.role.is_responder(), seq);
        let ciphertext = self
            .key
            .encrypt(&nonce, plaintext, b"")
            .map_err(|_| SessionError::EncryptionFailed)?;

        Ok(self.transport.send(&ciphertext).await?)
    }

    async fn receive_and_open(&mut self) -> Result<Vec<u8>, HandshakeError> {
        let ciphertext = self.transport.receive().await?;

        let seq = next(&mut self.recv_seq)?;
        let nonce = Nonce::sequenced(&self.iv, self.role.peer().is_responder(), seq);
        let plaintext = self
            .key
            .decrypt(&nonce, &ciphertext, b"")
            .map_err(|_| SessionError::DecryptionFailed)?;
        Ok(plaintext)
    }
}

/// Session before the handshake nonces are combined.
///
/// Keyed with the ECDHE session key; carries only `ClientHello` and
/// `Challenge`.
pub struct PreAuthSession<T> {
    channel: Channel<T>,
    session_key: Zeroizing<[u8; SESSION_KEY_SIZE]>,
}

impl<T: MessageTransport> PreAuthSession<T> {
    /// Key a session from the key-exchange output.
    pub fn new(transport: T, secrets: &SessionSecrets, role: Role) -> Self {
        Self {
            channel: Channel::new(
                transport,
                AeadKey::new(secrets.session_key),
                iv_from(&secrets.initial_nonce),
                role,
            ),
            session_key: Zeroizing::new(secrets.session_key),
        }
    }

    /// Encrypt `plaintext` and send it as one message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MessageTooLarge`] if the ciphertext would not
    /// fit one transport frame, or a transport error.
    pub async fn encrypt_and_send(&mut self, plaintext: &[u8]) -> Result<usize, HandshakeError> {
        self.channel.seal_and_send(plaintext).await
    }

    /// Receive one message and decrypt it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DecryptionFailed`] if authentication fails, or
    /// a transport error.
    pub async fn receive_and_decrypt(&mut self) -> Result<Vec<u8>, HandshakeError> {
        self.channel.receive_and_open().await
    }

    /// Install the combined nonce and move to the authenticated phase.
    ///
    /// Checks in constant time that the first half of `combined` is
    /// `expected_client_nonce`. The AEAD key is re-derived from the session
    /// key and the combined nonce, and message counters restart at zero.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::NonceMismatch`] if the client half differs.
    pub fn replace_nonce(
        self,
        combined: CombinedNonce,
        expected_client_nonce: &HandshakeNonce,
    ) -> Result<AuthSession<T>, HandshakeError> {
        let mut echoed = [0u8; HANDSHAKE_NONCE_SIZE];
        echoed.copy_from_slice(&combined[..HANDSHAKE_NONCE_SIZE]);
        if !verify_32(&echoed, expected_client_nonce) {
            return Err(HandshakeError::NonceMismatch);
        }

        let phase_key =
            Kdf::new(PHASE_KEY_CONTEXT).derive_key(&[&self.session_key[..], &combined[..]]);
        let Self { channel, .. } = self;

        tracing::debug!("session nonce replaced ({:?})", channel.role);
        Ok(AuthSession {
            channel: Channel::new(
                channel.transport,
                AeadKey::new(phase_key),
                iv_from(&combined),
                channel.role,
            ),
            combined,
        })
    }
}

/// Session after the combined nonce is installed.
///
/// Bound messages carry the combined nonce as a 64-byte prefix, checked in
/// constant time on receipt.
pub struct AuthSession<T> {
    channel: Channel<T>,
    combined: CombinedNonce,
}

impl<T: MessageTransport> AuthSession<T> {
    /// The combined client/server nonce.
    #[must_use]
    pub fn combined_nonce(&self) -> &CombinedNonce {
        &self.combined
    }

    /// Encrypt `plaintext` and send it as one message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MessageTooLarge`] if the ciphertext would not
    /// fit one transport frame, or a transport error.
    pub async fn encrypt_and_send(&mut self, plaintext: &[u8]) -> Result<usize, HandshakeError> {
        self.channel.seal_and_send(plaintext).await
    }

    /// Receive one message and decrypt it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DecryptionFailed`] if authentication fails, or
    /// a transport error.
    pub async fn receive_and_decrypt(&mut self) -> Result<Vec<u8>, HandshakeError> {
        self.channel.receive_and_open().await
    }

    /// Send `combined ‖ body`.
    ///
    /// # Errors
    ///
    /// Same as [`AuthSession::encrypt_and_send`].
    pub async fn send_bound(&mut self, body: &[u8]) -> Result<usize, HandshakeError> {
        let message = Zeroizing::new(messages::bind(&self.combined, body));
        self.channel.seal_and_send(&message).await
    }

    /// Receive a bound message and return its body.
    ///
    /// `message` names the expected message in errors.
    ///
    /// # Errors
    ///
    /// - [`HandshakeError::Protocol`] if the message is shorter than the
    ///   nonce prefix
    /// - [`HandshakeError::NonceMismatch`] if the prefix is not this
    ///   session's combined nonce
    pub async fn receive_bound(
        &mut self,
        message: &'static str,
    ) -> Result<Vec<u8>, HandshakeError> {
        let plaintext = Zeroizing::new(self.channel.receive_and_open().await?);
        let (prefix, body) = messages::split_bound(&plaintext, message)?;
        if !verify_64(&prefix, &self.combined) {
            return Err(HandshakeError::NonceMismatch);
        }
        Ok(body.to_vec())
    }
}
