//! Profile gateway (backend-for-frontend).
//!
//! # Architecture Overview
//!
//! ```text
//!  GET /api/profile/{id}
//!        │
//!        ▼
//!  ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │ http server│──▶│ rate limiter │──▶│response cache│── hit ──▶ cached bytes
//!  └────────────┘   └──────┬───────┘   └──────┬───────┘
//!                          │ shared store     │ miss
//!                          ▼                  ▼
//!                    ┌──────────┐      ┌──────────────┐
//!                    │  store   │      │ user (retry) │── fail ──▶ 404
//!                    └──────────┘      └──────┬───────┘
//!                                             │ spawn
//!                 ┌───────────────────────────┼─────────────────────────┐
//!                 ▼                           ▼                         ▼
//!          ┌──────────────┐          ┌────────────────┐      ┌──────────────────┐
//!          │orders (retry)│          │products (retry)│      │recs (breaker→    │
//!          └──────┬───────┘          └───────┬────────┘      │      retry)      │
//!                 │                          │               └────────┬─────────┘
//!                 └──────────── join ────────┴────────────────────────┘
//!                                    │ failures → []
//!                                    ▼
//!                      assemble → detached cache write → 200
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use profile_gateway::config::loader::load_config;
use profile_gateway::lifecycle::{signals, Shutdown};
use profile_gateway::observability::{logging, metrics};
use profile_gateway::store::memory::SWEEP_INTERVAL;
use profile_gateway::store::MemoryStore;
use profile_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "profile-gateway")]
#[command(about = "Backend-for-frontend profile gateway", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and environment variables apply without it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("profile-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        user_url = %config.upstreams.user_url,
        max_attempts = config.retries.max_attempts,
        breaker_threshold = config.breaker.failure_threshold,
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

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let store = MemoryStore::new();
    tokio::spawn(store.clone().run_sweeper(SWEEP_INTERVAL, shutdown.subscribe()));

    let server = GatewayServer::new(config, Arc::new(store))?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
