//! Transport error types.

use std::io;
use thiserror::Error;

/// Transport layer errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer closed the stream cleanly between frames
    #[error("transport is closed")]
    Closed,

    /// A read or write did not complete in time
    #[error("transport operation timed out")]
    Timeout,

    /// The byte stream did not contain a well-formed frame
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
}

/// Frame-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Stream ended inside a length prefix or payload
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the frame section needed
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Declared or requested payload length exceeds the limit
    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge {
        /// Payload length
        len: usize,
        /// Configured maximum
        max: usize,
    },
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
