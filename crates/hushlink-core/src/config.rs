//! Handshake configuration.

use hushlink_crypto::scram::KdfParams;
use std::time::Duration;

/// Default deadline for a complete handshake.
///
/// Generous because the client runs a full-cost Argon2 derivation inside it.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(120);

/// Mutual authentication settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Argon2id parameters the client salts its password with.
    ///
    /// Must match the parameters the server's records were provisioned with.
    pub kdf: KdfParams,
    /// Answer unknown users with a decoy challenge instead of aborting
    pub conceal_unknown_users: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            conceal_unknown_users: true,
        }
    }
}

/// Handshake settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Authentication settings
    pub auth: AuthConfig,
    /// Deadline for the whole handshake (`None` = no overall deadline)
    pub handshake_timeout: Option<Duration>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
        }
    }
}

impl HandshakeConfig {
    /// Cheap KDF and no deadline, for tests.
    #[must_use]
    pub fn low_cost() -> Self {
        Self {
            auth: AuthConfig {
                kdf: KdfParams::low_cost(),
                ..AuthConfig::default()
            },
            handshake_timeout: None,
        }
    }
}
