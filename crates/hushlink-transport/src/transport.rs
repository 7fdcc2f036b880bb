//! Message transport abstraction.
//!
//! The handshake is written against [`MessageTransport`] rather than a
//! concrete stream so it can run over TCP, in-memory pipes in tests, or
//! wrappers that record or tamper with traffic.

use crate::TransportResult;
use async_trait::async_trait;

/// Async message-oriented transport.
///
/// Each `send` delivers exactly one message that a single `receive` on the
/// peer returns unchanged.
///
/// # Examples
///
/// ```no_run
/// use hushlink_transport::{FramedTransport, MessageTransport, TransportConfig};
/// use tokio::net::TcpStream;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = TcpStream::connect("127.0.0.1:7700").await?;
/// let mut transport = FramedTransport::new(stream, TransportConfig::default());
///
/// transport.send(b"hello").await?;
/// let reply = transport.receive().await?;
/// println!("Received {} bytes", reply.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MessageTransport: Send {
    /// Send one message.
    ///
    /// # Returns
    /// The number of bytes written to the stream, framing included
    ///
    /// # Errors
    /// Returns `TransportError` if the message is too large or the write fails
    async fn send(&mut self, payload: &[u8]) -> TransportResult<usize>;

    /// Receive one complete message.
    ///
    /// # Errors
    /// Returns `TransportError::Closed` on a clean disconnect between
    /// messages, `TransportError::Framing` for a malformed or truncated frame
    async fn receive(&mut self) -> TransportResult<Vec<u8>>;

    /// Largest payload this transport accepts.
    fn max_payload_len(&self) -> usize;

    /// Get transport statistics (optional).
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

#[async_trait]
impl<T: MessageTransport + ?Sized> MessageTransport for Box<T> {
    async fn send(&mut self, payload: &[u8]) -> TransportResult<usize> {
        (**self).send(payload).await
    }

    async fn receive(&mut self) -> TransportResult<Vec<u8>> {
        (**self).receive().await
    }

    fn max_payload_len(&self) -> usize {
        (**self).max_payload_len()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

/// Transport statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Total bytes sent, framing included
    pub bytes_sent: u64,
    /// Total bytes received, framing included
    pub bytes_received: u64,
    /// Messages sent
    pub messages_sent: u64,
    /// Messages received
    pub messages_received: u64,
    /// Send errors
    pub send_errors: u64,
    /// Receive errors
    pub recv_errors: u64,
}

impl TransportStats {
    /// Create new empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful send
    pub fn record_send(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
        self.messages_sent += 1;
    }

    /// Record a successful receive
    pub fn record_recv(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.messages_received += 1;
    }

    /// Record a send error
    pub fn record_send_error(&mut self) {
        self.send_errors += 1;
    }

    /// Record a receive error
    pub fn record_recv_error(&mut self) {
        self.recv_errors += 1;
    }
}
