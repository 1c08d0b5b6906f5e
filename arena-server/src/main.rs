//! Arena engine service - main entry point
//!
//! Hosts the real-time feedback aggregation and ranking engine behind an
//! HTTP/SSE API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arena_common::config::{resolve_database_path, ServerConfig};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_server::api;
use arena_server::db::init::init_database;
use arena_server::orchestrator::HttpAgentRunner;
use arena_server::AppState;

/// Command-line arguments for arena-server
#[derive(Parser, Debug)]
#[command(name = "arena-server")]
#[command(about = "Real-time feedback and ranking engine for the review arena")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "ARENA_PORT")]
    port: u16,

    /// Database file path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "ARENA_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the external agent runner service
    #[arg(long, env = "ARENA_RUNNER_URL")]
    runner_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arena_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match args.config {
        Some(ref path) => ServerConfig::load(path).context("Failed to load config file")?,
        None => ServerConfig::default(),
    };

    let db_path = resolve_database_path(args.database.as_deref(), "ARENA_DATABASE", &config);
    info!("Starting arena-server on port {}", args.port);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let runner_url = args
        .runner_url
        .or(config.agent_runner_url)
        .unwrap_or_else(|| "http://127.0.0.1:5760".to_string());
    info!("Agent runner: {}", runner_url);
    let runner = Arc::new(HttpAgentRunner::new(runner_url));

    let (state, _pipeline) = AppState::initialize(pool, runner, args.port)
        .await
        .context("Failed to initialize engine state")?;

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
