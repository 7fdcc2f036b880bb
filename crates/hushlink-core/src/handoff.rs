//! Result of a successful handshake.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Keys both peers hold after mutual authentication.
///
/// Returned by [`crate::connect`] and [`crate::Acceptor::accept`]. The client
/// and server handoffs for one connection carry identical values. Key
/// material is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PeerHandoff {
    username: String,
    client_key: [u8; 32],
    server_key: [u8; 32],
}

impl PeerHandoff {
    pub(crate) fn new(username: String, client_key: [u8; 32], server_key: [u8; 32]) -> Self {
        Self {
            username,
            client_key,
            server_key,
        }
    }

    /// The authenticated username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The user's SCRAM client key.
    #[must_use]
    pub fn client_key(&self) -> &[u8; 32] {
        &self.client_key
    }

    /// The user's SCRAM server key.
    #[must_use]
    pub fn server_key(&self) -> &[u8; 32] {
        &self.server_key
    }
}

impl fmt::Debug for PeerHandoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandoff")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
