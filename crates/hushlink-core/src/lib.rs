//! # hushlink Core
//!
//! Handshake implementation for hushlink: a confidential, mutually
//! authenticated channel between two peers without external PKI.
//!
//! This crate provides:
//! - Ephemeral P-521 key exchange over a framed transport
//! - A two-phase AES-256-GCM secure session
//! - SCRAM-style mutual authentication (client and server state machines)
//! - Credential lookup (in-memory and flat-file stores) and provisioning
//! - Error types classified by transport, protocol and authentication
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Mutual Authentication                         │
//! │   (ClientHello, Challenge, ClientProof, status, ServerProof)     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                       Secure Session                             │
//! │   (PreAuthSession -> replace_nonce -> AuthSession)               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                        Key Exchange                              │
//! │   (ephemeral ECDHE P-521, session key = SHA-512/256(x))          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      Framed Transport                            │
//! │   (u32 length prefix over any async byte stream)                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use hushlink_core::{Acceptor, HandshakeConfig, MemoryCredentialStore, connect};
//! use hushlink_transport::{FramedTransport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:7700").await?;
//! let transport = FramedTransport::new(stream, TransportConfig::default());
//!
//! let handoff = connect(transport, "alice", b"alicespass", &HandshakeConfig::default()).await?;
//! println!("authenticated as {}", handoff.username());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handoff;
pub mod handshake;
pub mod key_exchange;
pub mod messages;
pub mod session;

pub use auth::AuthState;
pub use config::{AuthConfig, HandshakeConfig};
pub use credentials::{
    CredentialRecord, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    ProvisionedRecord,
};
pub use error::{
    CredentialError, ErrorKind, HandshakeError, ProofFailure, ProtocolViolation, SessionError,
};
pub use handoff::PeerHandoff;
pub use handshake::{Acceptor, connect};
pub use key_exchange::{Role, negotiate};
pub use session::{AuthSession, PreAuthSession};

/// Maximum username length in bytes.
pub const MAX_USERNAME_LEN: usize = 255;
