//! TCP loopback fixture: one server acceptor, any number of clients.
//!
//! # Example
//!
//! ```no_run
//! use hushlink_integration_tests::fixtures::{LoopbackFixture, TestUser};
//!
//! # async fn example() {
//! let fixture = LoopbackFixture::new(&[TestUser::ALICE]).await.unwrap();
//! let (client, server) = fixture.handshake("alice", b"alicespass").await;
//! assert_eq!(client.unwrap().client_key(), server.unwrap().client_key());
//! # }
//! ```

use hushlink_core::{
    Acceptor, CredentialRecord, CredentialStore, HandshakeConfig, HandshakeError,
    MemoryCredentialStore, PeerHandoff, connect,
};
use hushlink_crypto::random;
use hushlink_transport::{FramedTransport, TransportConfig, TransportError};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A username/password pair provisioned into the fixture's store.
#[derive(Debug, Clone, Copy)]
pub struct TestUser {
    /// Username
    pub name: &'static str,
    /// Password
    pub password: &'static [u8],
}

impl TestUser {
    /// `alice` / `alicespass`
    pub const ALICE: Self = Self {
        name: "alice",
        password: b"alicespass",
    };

    /// `bob` / `bobspass`
    pub const BOB: Self = Self {
        name: "bob",
        password: b"bobspass",
    };
}

/// Server listening on an ephemeral loopback port.
pub struct LoopbackFixture {
    listener: TcpListener,
    acceptor: Arc<Acceptor>,
    store: Arc<MemoryCredentialStore>,
    config: HandshakeConfig,
    addr: SocketAddr,
}

impl LoopbackFixture {
    /// Provision `users` with random salts and cheap KDF parameters.
    pub async fn new(users: &[TestUser]) -> Result<Self, Box<dyn Error>> {
        Self::with_config(users, HandshakeConfig::low_cost()).await
    }

    /// Provision `users` with `config.auth.kdf`; both sides share `config`.
    pub async fn with_config(
        users: &[TestUser],
        config: HandshakeConfig,
    ) -> Result<Self, Box<dyn Error>> {
        let mut store = MemoryCredentialStore::new();
        for user in users {
            let salt = random::random_32()?;
            let provisioned = CredentialRecord::provision(user.password, &salt, &config.auth.kdf)?;
            store.insert(user.name, provisioned.record.clone());
        }
        Self::with_store(store, config).await
    }

    /// Serve an existing store.
    pub async fn with_store(
        store: MemoryCredentialStore,
        config: HandshakeConfig,
    ) -> Result<Self, Box<dyn Error>> {
        let store = Arc::new(store);
        let acceptor = Arc::new(Acceptor::new(store.clone(), config.clone())?);
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        Ok(Self {
            listener,
            acceptor,
            store,
            config,
            addr,
        })
    }

    /// The server's address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The configuration both sides use.
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// The record the server holds for `username`.
    pub fn record(&self, username: &str) -> Option<CredentialRecord> {
        self.store.lookup(username)
    }

    /// Accept one connection and run the server handshake on it.
    pub async fn accept_one(&self) -> Result<PeerHandoff, HandshakeError> {
        let (stream, _) = self.listener.accept().await.map_err(TransportError::Io)?;
        self.acceptor
            .accept(FramedTransport::new(stream, TransportConfig::default()))
            .await
    }

    /// Connect as a client and run the client handshake.
    pub async fn connect_as(
        &self,
        username: &str,
        password: &[u8],
    ) -> Result<PeerHandoff, HandshakeError> {
        let stream = TcpStream::connect(self.addr)
            .await
            .map_err(TransportError::Io)?;
        connect(
            FramedTransport::new(stream, TransportConfig::default()),
            username,
            password,
            &self.config,
        )
        .await
    }

    /// Run one client and one server handshake against each other.
    pub async fn handshake(
        &self,
        username: &str,
        password: &[u8],
    ) -> (
        Result<PeerHandoff, HandshakeError>,
        Result<PeerHandoff, HandshakeError>,
    ) {
        tokio::join!(self.connect_as(username, password), self.accept_one())
    }

    /// Accept `count` connections, each handshake on its own task.
    pub fn spawn_server(
        self: &Arc<Self>,
        count: usize,
    ) -> JoinHandle<Vec<Result<PeerHandoff, HandshakeError>>> {
        let fixture = Arc::clone(self);
        tokio::spawn(async move {
            let mut tasks: Vec<JoinHandle<Result<PeerHandoff, HandshakeError>>> =
                Vec::with_capacity(count);
            for _ in 0..count {
                let (stream, _) = match fixture.listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tasks.push(tokio::spawn(async move {
                            Err(HandshakeError::Transport(TransportError::Io(e)))
                        }));
                        continue;
                    }
                };
                let acceptor = Arc::clone(&fixture.acceptor);
                tasks.push(tokio::spawn(async move {
                    acceptor
                        .accept(FramedTransport::new(stream, TransportConfig::default()))
                        .await
                }));
            }

            let mut results = Vec::with_capacity(count);
            for task in tasks {
                match task.await {
                    Ok(result) => results.push(result),
                    Err(e) => results.push(Err(HandshakeError::Transport(TransportError::Io(
                        std::io::Error::other(e),
                    )))),
                }
            }
            results
        })
    }
}
