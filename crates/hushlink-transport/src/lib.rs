//! # hushlink Transport
//!
//! Framed message transport for the hushlink handshake.
//!
//! This crate provides:
//! - A length-prefixed frame codec (4-byte big-endian length, then payload)
//! - [`FramedTransport`], the codec over any `AsyncRead + AsyncWrite` stream
//! - The [`MessageTransport`] trait the handshake is written against
//! - Per-message read and write timeouts
//!
//! A frame that ends early is always reported as
//! [`FramingError::Truncated`]; a short read is never handed up as a message.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod framed;
pub mod transport;

pub use error::{FramingError, TransportError, TransportResult};
pub use framed::FramedTransport;
pub use transport::{MessageTransport, TransportStats};

use std::time::Duration;

/// Size of the frame length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload length (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Default per-message timeout.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Largest payload accepted or sent, in bytes
    pub max_frame_len: usize,
    /// Timeout for receiving one complete frame (`None` = wait forever)
    pub read_timeout: Option<Duration>,
    /// Timeout for writing and flushing one frame (`None` = wait forever)
    pub write_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_timeout: Some(DEFAULT_IO_TIMEOUT),
            write_timeout: Some(DEFAULT_IO_TIMEOUT),
        }
    }
}

impl TransportConfig {
    /// Configuration with no timeouts, for in-process pipes.
    #[must_use]
    pub fn without_timeouts() -> Self {
        Self {
            read_timeout: None,
            write_timeout: None,
            ..Self::default()
        }
    }
}
