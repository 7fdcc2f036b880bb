//! Configuration system for the hushlink CLI.

use anyhow::Context;
use hushlink_core::{AuthConfig, HandshakeConfig};
use hushlink_crypto::scram::KdfParams;
use hushlink_transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest frame limit that still fits every handshake message.
const MIN_FRAME_LEN: usize = 1024;
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// hushlink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,
    /// Handshake configuration
    #[serde(default)]
    pub handshake: HandshakeSettings,
    /// Argon2id parameters; must match the record file
    #[serde(default)]
    pub kdf: KdfParams,
    /// Credential store configuration
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Listen address for `serve`
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Largest accepted frame in bytes
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Per-message read/write timeout in seconds (0 = none)
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

/// Handshake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeSettings {
    /// Deadline for a whole handshake in seconds (0 = none)
    #[serde(default = "default_handshake_timeout_secs")]
    pub timeout_secs: u64,
    /// Answer unknown users with a decoy challenge
    #[serde(default = "default_true")]
    pub conceal_unknown_users: bool,
}

/// Credential store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Record file used by `serve` and `add-user`
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_listen_addr() -> String {
    "127.0.0.1:7700".to_string()
}

fn default_max_frame_len() -> usize {
    hushlink_transport::DEFAULT_MAX_FRAME_LEN
}

fn default_io_timeout_secs() -> u64 {
    hushlink_transport::DEFAULT_IO_TIMEOUT.as_secs()
}

fn default_handshake_timeout_secs() -> u64 {
    hushlink_core::config::DEFAULT_HANDSHAKE_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_users_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("hushlink/users.csv")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_frame_len: default_max_frame_len(),
            io_timeout_secs: default_io_timeout_secs(),
        }
    }
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_handshake_timeout_secs(),
            conceal_unknown_users: true,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Read a TOML file; missing sections and keys take their defaults.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors and malformed TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// `<config dir>/hushlink/config.toml`
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("hushlink/config.toml")
    }

    /// Read the file at [`Config::default_path`], writing the defaults there
    /// on first run.
    ///
    /// # Errors
    ///
    /// Fails if the existing file is unreadable or the new one cannot be
    /// written.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// The `serve` bind address.
    ///
    /// # Errors
    ///
    /// Fails if `network.listen_addr` is not `host:port`.
    pub fn parse_listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.network
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen_addr {:?}", self.network.listen_addr))
    }

    /// Check every section before any socket is opened.
    ///
    /// # Errors
    ///
    /// Names the first offending setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.parse_listen_addr()?;

        if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&self.network.max_frame_len) {
            anyhow::bail!(
                "max_frame_len must be between {} and {} bytes",
                MIN_FRAME_LEN,
                MAX_FRAME_LEN
            );
        }

        self.kdf.validate()?;

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        let level = self.logging.level.to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "unknown log level {:?}; expected one of {}",
                self.logging.level,
                LEVELS.join(", ")
            );
        }

        Ok(())
    }

    /// Framing settings for both client and server connections.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        let timeout = seconds(self.network.io_timeout_secs);
        TransportConfig {
            max_frame_len: self.network.max_frame_len,
            read_timeout: timeout,
            write_timeout: timeout,
        }
    }

    /// Handshake settings for `serve` and `connect`.
    #[must_use]
    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            auth: AuthConfig {
                kdf: self.kdf,
                conceal_unknown_users: self.handshake.conceal_unknown_users,
            },
            handshake_timeout: seconds(self.handshake.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.listen_addr, "127.0.0.1:7700");
        assert_eq!(config.network.max_frame_len, 1024 * 1024);
        assert_eq!(config.kdf, KdfParams::default());
        assert!(config.handshake.conceal_unknown_users);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.network.listen_addr = "not an address".to_string();
        assert!(config.validate().is_err());

        config.network.listen_addr = default_listen_addr();
        config.network.max_frame_len = 16;
        assert!(config.validate().is_err());

        config.network.max_frame_len = default_max_frame_len();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        config.kdf.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [network]
            listen_addr = "0.0.0.0:9000"

            [kdf]
            memory_cost_kib = 1024
            parallelism = 1

            [handshake]
            timeout_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.network.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.network.io_timeout_secs, 30);
        assert_eq!(config.kdf.memory_cost_kib, 1024);
        assert_eq!(config.kdf.iterations, 1);
        assert!(config.handshake.conceal_unknown_users);
        assert_eq!(config.handshake_config().handshake_timeout, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_derived_library_configs() {
        let mut config = Config::default();
        config.network.io_timeout_secs = 0;
        config.handshake.conceal_unknown_users = false;

        let transport = config.transport_config();
        assert_eq!(transport.read_timeout, None);
        assert_eq!(transport.write_timeout, None);

        let handshake = config.handshake_config();
        assert!(!handshake.auth.conceal_unknown_users);
        assert_eq!(handshake.handshake_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.kdf = KdfParams::low_cost();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.kdf, KdfParams::low_cost());
        assert_eq!(loaded.credentials.users_file, config.credentials.users_file);
    }
}
