//! Length-prefixed framing over an async byte stream.
//!
//! Wire format:
//!
//! ```text
//! +----------------+---------------------+
//! | length (u32 BE)| payload (length B)  |
//! +----------------+---------------------+
//! ```

use crate::transport::{MessageTransport, TransportStats};
use crate::{FramingError, LENGTH_PREFIX_SIZE, TransportConfig, TransportError, TransportResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Encode `payload` as a single frame.
///
/// # Errors
///
/// Returns [`FramingError::TooLarge`] if the payload exceeds `max_len` or
/// cannot be described by a 32-bit length.
pub fn encode_frame(payload: &[u8], max_len: usize) -> Result<Vec<u8>, FramingError> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|_| payload.len() <= max_len)
        .ok_or(FramingError::TooLarge {
            len: payload.len(),
            max: max_len,
        })?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Decode one frame from the start of `buf`.
///
/// Returns the payload and the number of bytes consumed.
///
/// # Errors
///
/// - [`FramingError::Truncated`] if `buf` ends inside the prefix or payload
/// - [`FramingError::TooLarge`] if the declared length exceeds `max_len`
pub fn decode_frame(buf: &[u8], max_len: usize) -> Result<(&[u8], usize), FramingError> {
    let Some(prefix) = buf.get(..LENGTH_PREFIX_SIZE) else {
        return Err(FramingError::Truncated {
            expected: LENGTH_PREFIX_SIZE,
            actual: buf.len(),
        });
    };
    let len = declared_len(prefix, max_len)?;

    let body = &buf[LENGTH_PREFIX_SIZE..];
    if body.len() < len {
        return Err(FramingError::Truncated {
            expected: len,
            actual: body.len(),
        });
    }
    Ok((&body[..len], LENGTH_PREFIX_SIZE + len))
}

fn declared_len(prefix: &[u8], max_len: usize) -> Result<usize, FramingError> {
    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    header.copy_from_slice(prefix);
    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(FramingError::TooLarge { len, max: max_len });
    }
    Ok(len)
}

async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> TransportResult<T>
where
    F: Future<Output = TransportResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TransportError::Timeout)?,
        None => fut.await,
    }
}

/// Fill `buf` completely, reporting how far we got if the stream ends.
async fn read_full<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut [u8],
) -> TransportResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn read_frame<S: AsyncRead + Unpin>(
    stream: &mut S,
    max_len: usize,
) -> TransportResult<Vec<u8>> {
    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    match read_full(stream, &mut header).await? {
        0 => return Err(TransportError::Closed),
        LENGTH_PREFIX_SIZE => {}
        actual => {
            return Err(FramingError::Truncated {
                expected: LENGTH_PREFIX_SIZE,
                actual,
            }
            .into());
        }
    }

    let len = declared_len(&header, max_len)?;
    let mut payload = vec![0u8; len];
    let actual = read_full(stream, &mut payload).await?;
    if actual != len {
        return Err(FramingError::Truncated {
            expected: len,
            actual,
        }
        .into());
    }
    Ok(payload)
}

/// Framed transport over a byte stream.
///
/// Works with `TcpStream`, `tokio::io::DuplexStream`, or any other
/// `AsyncRead + AsyncWrite` type.
pub struct FramedTransport<S> {
    stream: S,
    config: TransportConfig,
    stats: TransportStats,
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a stream.
    pub fn new(stream: S, config: TransportConfig) -> Self {
        Self {
            stream,
            config,
            stats: TransportStats::new(),
        }
    }

    async fn write_frame(&mut self, payload: &[u8]) -> TransportResult<usize> {
        let frame = encode_frame(payload, self.config.max_frame_len)?;
        let stream = &mut self.stream;
        with_timeout(self.config.write_timeout, async move {
            stream.write_all(&frame).await?;
            stream.flush().await?;
            Ok(frame.len())
        })
        .await
    }
}

#[async_trait]
impl<S> MessageTransport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, payload: &[u8]) -> TransportResult<usize> {
        match self.write_frame(payload).await {
            Ok(written) => {
                self.stats.record_send(written);
                Ok(written)
            }
            Err(e) => {
                self.stats.record_send_error();
                tracing::debug!("send of {} byte message failed: {}", payload.len(), e);
                Err(e)
            }
        }
    }

    async fn receive(&mut self) -> TransportResult<Vec<u8>> {
        let result = with_timeout(
            self.config.read_timeout,
            read_frame(&mut self.stream, self.config.max_frame_len),
        )
        .await;

        match result {
            Ok(payload) => {
                self.stats.record_recv(LENGTH_PREFIX_SIZE + payload.len());
                Ok(payload)
            }
            Err(TransportError::Closed) => Err(TransportError::Closed),
            Err(e) => {
                self.stats.record_recv_error();
                tracing::debug!("receive failed: {}", e);
                Err(e)
            }
        }
    }

    fn max_payload_len(&self) -> usize {
        self.config.max_frame_len
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
