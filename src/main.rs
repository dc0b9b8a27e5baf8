//! Service gateway
//!
//! A reverse proxy that routes requests to upstream services by path prefix.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                    GATEWAY                        │
//!                         │                                                   │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!     ────────────────────┼─▶│  http   │───▶│ registry │───▶│  dispatch  │───┼──▶ Upstream
//!                         │  │ server  │    │  lookup  │    │  forward   │   │
//!                         │  └────┬────┘    └────▲─────┘    └────────────┘   │
//!                         │       │              │                            │
//!     POST /discovery     │  ┌────▼─────┐   ┌────┴─────┐    ┌────────────┐   │
//!     ────────────────────┼─▶│discovery │──▶│ registry │───▶│   store    │   │
//!                         │  └──────────┘   │ mutation │    │  snapshot  │   │
//!                         │                 └────▲─────┘    └────────────┘   │
//!                         │                      │                            │
//!                         │                 ┌────┴─────┐                      │
//!                         │                 │  health  │ (every 30s)          │
//!                         │                 │ monitor  │                      │
//!                         │                 └──────────┘                      │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use service_gateway::config::loader::load_config;
use service_gateway::config::GatewayConfig;
use service_gateway::lifecycle::{signals, startup, Shutdown};
use service_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "Path-prefix reverse proxy with health checks and self-registration", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("service-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        discovery_path = %config.discovery.path,
        static_services = config.services.len(),
        store = ?config.store.backend,
        "Configuration loaded"
    );

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(shutdown.clone());

    startup::run(config, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
