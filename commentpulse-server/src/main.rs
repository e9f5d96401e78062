//! commentpulse-server - analytics ingestion and aggregation service
//!
//! Records comment generation/selection events from browser-extension
//! producers and serves cached time-window summaries.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use commentpulse_core::{Config, Database};
use commentpulse_server::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "commentpulse-server", about, version)]
struct Args {
    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Config file path (defaults to the XDG location)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db) = args.db {
        config.database.path = Some(db);
    }

    // Initialize logging
    let _log_guard = commentpulse_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!("commentpulse-server starting up");

    // Open database
    let db_path = config.database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let state = Arc::new(AppState::new(
        db,
        Duration::from_millis(config.server.store_timeout_ms),
        config.server.broadcast_capacity,
    ));
    let app = commentpulse_server::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;

    tracing::info!(%addr, "Analytics server listening");
    axum::serve(listener, app)
        .await
        .context("server terminated")?;

    Ok(())
}
