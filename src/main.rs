//! Gateway binary entry point.
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 RENTAL GATEWAY               │
//!                         │                                              │
//!    Client Request       │  ┌────────┐   ┌─────────┐   ┌────────────┐  │
//!    ─────────────────────┼─▶│ server │──▶│ routing │──▶│  health    │  │
//!                         │  └────────┘   │  table  │   │  snapshot  │  │
//!                         │               └─────────┘   └─────┬──────┘  │
//!                         │                                   ▼         │
//!                         │                            ┌────────────┐   │
//!                         │                            │  circuit   │   │
//!                         │                            │  breaker   │   │
//!                         │                            └─────┬──────┘   │
//!    Client Response      │  ┌──────────┐                    ▼          │
//!    ◀────────────────────┼──│ response │◀────────── forwarder ◀────────┼── Backend
//!                         │  │translate │            (retries)          │   Service
//!                         │  └──────────┘                               │
//!                         │                                             │
//!                         │  probe loop ── one concurrent GET per       │
//!                         │  (30s tick)    service health endpoint      │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rental_gateway::config::{load_config, GatewayConfig};
use rental_gateway::lifecycle::Shutdown;
use rental_gateway::observability::logging;
use rental_gateway::proxy::GatewayServer;

#[derive(Debug, Parser)]
#[command(name = "rental-gateway", about = "Failure-isolating API gateway")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration errors are fatal: abort before any request is served.
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        routes = config.routes.len(),
        "rental-gateway starting"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = GatewayServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
