//! Mutual authentication state tracking.

use crate::error::HandshakeError;
use crate::key_exchange::Role;

/// Phase of the mutual authentication exchange.
///
/// Both sides walk the same phases; each names the message being produced or
/// consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    /// Session established, nothing exchanged yet
    Init,
    /// Client nonce and username
    ClientHello,
    /// Combined nonce and salt; the session nonce is replaced here
    Challenge,
    /// Client proof
    ClientProof,
    /// Server verdict on the client proof
    ServerVerify,
    /// Server signature and the client's verdict on it
    ServerProof,
    /// Both proofs accepted (terminal)
    Authenticated,
    /// Handshake aborted (terminal)
    Failed,
}

impl AuthState {
    /// True for `Authenticated` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed)
    }

    /// Check whether `to` may follow this state.
    ///
    /// Phases advance strictly in order; any non-terminal state may fail.
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        match (self, to) {
            (from, Self::Failed) => !from.is_terminal(),
            (Self::Init, Self::ClientHello)
            | (Self::ClientHello, Self::Challenge)
            | (Self::Challenge, Self::ClientProof)
            | (Self::ClientProof, Self::ServerVerify)
            | (Self::ServerVerify, Self::ServerProof)
            | (Self::ServerProof, Self::Authenticated) => true,
            _ => false,
        }
    }
}

/// One side's progress through the exchange.
#[derive(Debug)]
pub struct AuthProgress {
    state: AuthState,
    role: Role,
}

impl AuthProgress {
    /// Start in [`AuthState::Init`].
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            state: AuthState::Init,
            role,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Move to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::InvalidState`] if the transition is out of
    /// order.
    pub fn transition_to(&mut self, to: AuthState) -> Result<(), HandshakeError> {
        if !self.state.can_transition(to) {
            return Err(HandshakeError::InvalidState {
                from: self.state,
                to,
            });
        }

        let from = self.state;
        self.state = to;
        tracing::debug!("{:?} auth state transition: {:?} -> {:?}", self.role, from, to);
        Ok(())
    }

    /// Move to [`AuthState::Failed`] unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            let from = self.state;
            self.state = AuthState::Failed;
            tracing::debug!(
                "{:?} auth state transition: {:?} -> Failed",
                self.role,
                from
            );
        }
    }
}
