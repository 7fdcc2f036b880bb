//! hushlink CLI
//!
//! Password-authenticated encrypted channel without certificates.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hushlink_core::credentials::append_record;
use hushlink_core::{Acceptor, CredentialRecord, FileCredentialStore};
use hushlink_crypto::random;
use hushlink_transport::FramedTransport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use config::Config;

/// Environment variable consulted before prompting for a password.
const PASSWORD_ENV: &str = "HUSHLINK_PASSWORD";

/// hushlink - mutually authenticated channel from a username and password
#[derive(Parser)]
#[command(name = "hushlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept and authenticate clients
    Serve {
        /// Listen address
        #[arg(short, long)]
        bind: Option<String>,

        /// Credential record file
        #[arg(short, long)]
        users: Option<PathBuf>,
    },

    /// Authenticate to a server
    #[command(after_help = "The password is read from HUSHLINK_PASSWORD, or prompted for when unset.")]
    Connect {
        /// Server address (host:port)
        #[arg(required = true)]
        addr: String,

        /// Username to authenticate as
        #[arg(short, long)]
        user: String,
    },

    /// Provision a user and append it to the record file
    #[command(after_help = "The password is read from HUSHLINK_PASSWORD, or prompted for when unset.")]
    AddUser {
        /// Username to add
        #[arg(required = true)]
        name: String,

        /// Credential record file
        #[arg(short, long)]
        users: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_or_default()?,
    };
    config.validate()?;

    let default_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Serve { bind, users } => {
            serve(bind, users, &config).await?;
        }
        Commands::Connect { addr, user } => {
            connect(addr, user, password_from_env(), &config).await?;
        }
        Commands::AddUser { name, users } => {
            add_user(name, users, password_from_env(), &config).await?;
        }
    }

    Ok(())
}

/// Accept loop: one task per connection until Ctrl+C.
async fn serve(bind: Option<String>, users: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| config.network.listen_addr.clone());
    let users = users.unwrap_or_else(|| config.credentials.users_file.clone());

    let store = FileCredentialStore::open(&users)
        .with_context(|| format!("Failed to load credentials from {}", users.display()))?;
    if store.is_empty() {
        tracing::warn!("{} holds no users; every client will be rejected", users.display());
    }
    let acceptor = Arc::new(Acceptor::new(Arc::new(store), config.handshake_config())?);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let transport_config = config.transport_config();

    println!("hushlink server");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Listen: {}", listener.local_addr()?);
    println!("Users: {}", users.display());
    println!("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        continue;
                    }
                };
                tracing::debug!("Connection from {}", peer);

                let acceptor = Arc::clone(&acceptor);
                let transport = FramedTransport::new(stream, transport_config.clone());
                tokio::spawn(async move {
                    match acceptor.accept(transport).await {
                        Ok(handoff) => {
                            tracing::info!("{}: authenticated as {}", peer, handoff.username());
                        }
                        Err(e) => {
                            tracing::warn!("{}: handshake failed ({:?}): {}", peer, e.kind(), e);
                        }
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    Ok(())
}

/// Password from the environment, never from argv.
fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV).ok().map(Zeroizing::new)
}

/// Run one client handshake.
async fn connect(
    addr: String,
    user: String,
    password: Option<Zeroizing<String>>,
    config: &Config,
) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => Zeroizing::new(rpassword::prompt_password(format!("Password for {user}: "))?),
    };

    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("Failed to connect to {addr}"))?;
    tracing::debug!("Connected to {}", addr);

    let transport = FramedTransport::new(stream, config.transport_config());
    let handoff = hushlink_core::connect(
        transport,
        &user,
        password.as_bytes(),
        &config.handshake_config(),
    )
    .await
    .with_context(|| format!("Handshake with {addr} failed"))?;

    println!("Authenticated to {} as {}", addr, handoff.username());
    Ok(())
}

/// Provision `name` with a fresh salt and append it to the record file.
async fn add_user(
    name: String,
    users: Option<PathBuf>,
    password: Option<Zeroizing<String>>,
    config: &Config,
) -> anyhow::Result<()> {
    let users = users.unwrap_or_else(|| config.credentials.users_file.clone());

    let password = match password {
        Some(password) => password,
        None => prompt_new_password(&name)?,
    };

    let salt = random::random_32()?;
    let params = config.kdf;
    let provisioned = tokio::task::spawn_blocking(move || {
        CredentialRecord::provision(password.as_bytes(), &salt, &params)
    })
    .await??;

    ensure_parent(&users)?;
    append_record(&users, &name, &provisioned)?;

    println!("Added {} to {}", name, users.display());
    Ok(())
}

fn prompt_new_password(name: &str) -> anyhow::Result<Zeroizing<String>> {
    let password = Zeroizing::new(rpassword::prompt_password(format!("New password for {name}: "))?);
    let confirm = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
    if *password != *confirm {
        anyhow::bail!("Passwords do not match");
    }
    Ok(password)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_connect() {
        let cli = Cli::try_parse_from([
            "hushlink",
            "connect",
            "127.0.0.1:7700",
            "--user",
            "alice",
        ])
        .unwrap();

        match cli.command {
            Commands::Connect { addr, user } => {
                assert_eq!(addr, "127.0.0.1:7700");
                assert_eq!(user, "alice");
            }
            _ => panic!("expected connect"),
        }
    }

    #[test]
    fn test_password_not_accepted_on_command_line() {
        for args in [
            ["hushlink", "connect", "127.0.0.1:7700", "--user", "alice", "--password", "pw"].as_slice(),
            ["hushlink", "add-user", "alice", "--password", "pw"].as_slice(),
        ] {
            assert!(
                Cli::try_parse_from(args.iter().copied()).is_err(),
                "accepted: {args:?}"
            );
        }

        let help = Cli::command()
            .find_subcommand_mut("add-user")
            .unwrap()
            .render_long_help()
            .to_string();
        assert!(help.contains(PASSWORD_ENV));
        assert!(!help.contains("--password"));
    }

    #[test]
    fn test_connect_requires_user() {
        assert!(Cli::try_parse_from(["hushlink", "connect", "127.0.0.1:7700"]).is_err());
    }

    #[tokio::test]
    async fn test_add_user_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("db/users.csv");
        let mut config = Config::default();
        config.kdf = hushlink_crypto::scram::KdfParams::low_cost();

        add_user(
            "alice".into(),
            Some(users.clone()),
            Some(Zeroizing::new("alicespass".into())),
            &config,
        )
        .await
        .unwrap();
        add_user(
            "bob".into(),
            Some(users.clone()),
            Some(Zeroizing::new("bobspass".into())),
            &config,
        )
        .await
        .unwrap();

        let store = FileCredentialStore::open(&users).unwrap();
        assert_eq!(store.len(), 2);

        let duplicate = add_user(
            "alice".into(),
            Some(users.clone()),
            Some(Zeroizing::new("other".into())),
            &config,
        )
        .await;
        assert!(duplicate.is_err());
    }
}
