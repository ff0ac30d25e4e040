//! Holdfast Marketplace Server
//!
//! Wires the escrow lifecycle coordinator over PostgreSQL, the chain
//! signing relay, and the external timer scheduler, and exposes the HTTP
//! surface: marketplace write paths, the buyer dispute endpoint, and the
//! bearer-token admin routes (sweep, resolve, reconcile).
//!
//! # Usage
//!
//! ```bash
//! # Start with environment configuration
//! DATABASE_URL=postgresql://localhost/holdfast holdfast-server
//!
//! # Override the bind address
//! holdfast-server --host 127.0.0.1 --port 3000
//! ```

mod config;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use holdfast_chain::RelayChainGateway;
use holdfast_coordinator::{DisputeResolver, EscrowCoordinator, TracingNotifier};
use holdfast_ledger::{LedgerStore, PgLedgerStore};
use holdfast_reputation::{ReputationRecorder, TracingTierLog};
use holdfast_timer::HttpTimerService;

use crate::config::ServerConfig;
use crate::routes::{create_router, AppState};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Holdfast marketplace server
#[derive(Parser, Debug)]
#[command(name = "holdfast-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "HOLDFAST_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HOLDFAST_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HOLDFAST_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "HOLDFAST_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Run pending database migrations before serving
    #[arg(long, env = "HOLDFAST_MIGRATE")]
    migrate: bool,

    /// Enable development mode (relaxed secret checks)
    #[arg(long, env = "HOLDFAST_DEV_MODE")]
    dev_mode: bool,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut server_config = ServerConfig::from_env();
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }

    init_logging(&args.log_level, &args.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Holdfast server"
    );

    server_config.validate(args.dev_mode)?;

    // Ledger store
    tracing::info!("Connecting to ledger store...");
    let store = Arc::new(PgLedgerStore::connect(&server_config.ledger).await?);
    if args.migrate {
        store.migrate().await?;
    }
    if !store.ping().await {
        anyhow::bail!("Ledger store health check failed");
    }
    tracing::info!("Ledger store ready");

    // Collaborators
    let chain = Arc::new(RelayChainGateway::new(server_config.chain.clone())?);
    let timers = Arc::new(HttpTimerService::new(server_config.timer.clone())?);
    let recorder = Arc::new(ReputationRecorder::new(
        store.clone() as Arc<dyn LedgerStore>,
        Arc::new(TracingTierLog),
    ));

    // Core
    let coordinator = Arc::new(EscrowCoordinator::new(
        store.clone(),
        chain.clone(),
        timers,
        recorder.clone(),
        server_config.coordinator.clone(),
    ));
    let resolver = Arc::new(DisputeResolver::new(
        store.clone(),
        chain,
        recorder,
        Arc::new(TracingNotifier),
    ));

    let state = Arc::new(AppState {
        store: store.clone(),
        coordinator,
        resolver,
        admin_token: server_config.admin_token.clone(),
        default_chain_id: server_config.coordinator.default_chain_id,
    });

    let app = create_router(state);
    let addr = server_config.socket_addr()?;

    tracing::info!(
        host = %server_config.host,
        port = %server_config.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Duration::from_secs(10)))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

// =============================================================================
// Initialization
// =============================================================================

/// Initialize tracing/logging
fn init_logging(level: &str, format: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match format {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    tracing::info!(
        timeout_secs = timeout.as_secs(),
        "Waiting for in-flight requests to complete..."
    );
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["holdfast-server", "--port", "3000"]);
        assert_eq!(args.port, Some(3000));
        assert!(!args.migrate);
    }
}
