//! SCRAM-style mutual authentication over a secure session.
//!
//! ```text
//! Client                                         Server
//!   │ ClientHello: client_nonce ‖ username          │
//!   │──────────────────────────────────────────────>│ lookup(username)
//!   │ Challenge: client_nonce ‖ server_nonce ‖ salt │
//!   │<──────────────────────────────────────────────│
//!   │            replace_nonce(combined)            │
//!   │ combined ‖ client_proof                       │
//!   │──────────────────────────────────────────────>│ verify proof
//!   │ combined ‖ SERVER_OK | SERVER_FAIL            │
//!   │<──────────────────────────────────────────────│
//!   │ combined ‖ server_signature                   │
//!   │<──────────────────────────────────────────────│
//!   │ verify signature                              │
//!   │ combined ‖ CLIENT_OK | CLIENT_FAIL            │
//!   │──────────────────────────────────────────────>│
//! ```
//!
//! There are no retries: any failure ends the connection's handshake.

pub mod client;
pub mod server;
pub mod state;

pub use server::DecoyRecords;
pub use state::{AuthProgress, AuthState};

use crate::error::HandshakeError;
use crate::messages::StatusToken;
use crate::session::AuthSession;
use hushlink_transport::MessageTransport;

/// Record the outcome of a run, logging failures.
fn conclude<T>(
    progress: &mut AuthProgress,
    result: Result<T, HandshakeError>,
) -> Result<T, HandshakeError> {
    if let Err(e) = &result {
        let at = progress.state();
        progress.fail();
        tracing::debug!("Authentication stopped at {:?} ({:?}): {}", at, e.kind(), e);
    }
    result
}

/// Best-effort rejection notice; the handshake fails either way.
async fn send_status_quietly<T: MessageTransport>(
    session: &mut AuthSession<T>,
    status: StatusToken,
) {
    if let Err(e) = session.send_bound(status.as_bytes()).await {
        tracing::debug!("Failed to send {:?}: {}", status, e);
    }
}
