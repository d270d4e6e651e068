//! Admission gate service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ──────────────▶ session check ──▶ identity bucket ──▶ route bucket ──▶ handlers
//!                        │                   │                 │
//!                        ▼                   └──── registry ───┘
//!                  session store                 (one lock)
//!                        ▲                           ▲
//!                        │                           │
//!               session sweeper              quota sweeper
//!              (every interval)            (daily, local midnight)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use admission_gate::config::{load_config, GateConfig};
use admission_gate::http::{GateServer, GateState};
use admission_gate::lifecycle::signals::shutdown_on_signal;
use admission_gate::lifecycle::Shutdown;
use admission_gate::observability::{logging, metrics};
use admission_gate::sessions::MemorySessionStore;
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "admission-gate")]
#[command(about = "Rate-limiting gate with background session and quota reclamation", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("admission-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        quota_retention_secs = config.quota_sweeper.retention_secs,
        session_interval_secs = config.session_sweeper.interval_secs,
        session_retention_secs = config.session_sweeper.retention_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let state = GateState::new(config, Arc::new(MemorySessionStore::new()))?;
    let server = GateServer::new(state);

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
