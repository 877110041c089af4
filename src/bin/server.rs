//! TaskMaster Sync Server
//!
//! Stores each user's todos, reminders, notes and stats as Automerge
//! documents and pushes snapshots to listening clients.
//!
//! # Configuration
//!
//! Environment variables:
//! - `TASKMASTER_PORT`: Port to listen on (default: 8080)
//! - `TASKMASTER_DATA_DIR`: Directory to store documents (default: ~/.local/share/taskmaster-server)
//! - `TASKMASTER_TOKEN_EXPIRY_DAYS`: Session lifetime in days (default: 30)
//!
//! # Data Layout
//!
//! ```text
//! <data_dir>/
//!   accounts.automerge
//!   tokens.json
//!   users/<user_id>/{todos,reminders,notes,settings}.automerge
//! ```
//!
//! See [`taskmaster::server::routes`] for the endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskmaster::server::{router, AccountStore, ServerState, ServerStorage, TokenStore};
use taskmaster::server::tokens::DEFAULT_EXPIRY_DAYS;

/// How often expired tokens are purged.
const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory to store Automerge documents
    data_dir: PathBuf,
    token_expiry_days: i64,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("TASKMASTER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("TASKMASTER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("taskmaster-server")
            });

        let token_expiry_days = std::env::var("TASKMASTER_TOKEN_EXPIRY_DAYS")
            .ok()
            .and_then(|d| d.parse().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_EXPIRY_DAYS);

        Self {
            port,
            data_dir,
            token_expiry_days,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskmaster=info,taskmaster_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Data directory: {}", config.data_dir.display());

    let state = ServerState::new(
        ServerStorage::new(&config.data_dir),
        AccountStore::load(&config.data_dir),
        TokenStore::open(&config.data_dir, config.token_expiry_days),
    );

    let tokens = state.tokens.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = tokens.cleanup_expired();
            if removed > 0 {
                tracing::info!("Removed {} expired token(s)", removed);
            }
        }
    });

    let hub = state.hub.clone();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        let closed = hub.close_all().await;
        tracing::info!("Shutting down, closed {} listener channel(s)", closed);
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
