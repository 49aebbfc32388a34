//! TechStore e-commerce API.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                    TECHSTORE API                      │
//!   Client Request   │  ┌──────────────┐  ┌───────────┐  ┌──────────────┐   │
//!   ─────────────────┼─▶│ correlation  │─▶│ identity  │─▶│ rate limiter │───┼──▶ handlers
//!                    │  │ (X-Request-ID)│  │ resolver  │  └──────┬───────┘   │
//!                    │  └──────────────┘  └───────────┘         │           │
//!                    │                                           ▼           │
//!                    │                                  ┌────────────────┐   │
//!                    │                                  │ counter store  │◀──┼──▶ Redis
//!                    │                                  │ (timeout-bound)│   │   (shared by
//!                    │                                  └────────────────┘   │    all instances)
//!                    └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use techstore_api::config::load_config;
use techstore_api::lifecycle::{signals, Shutdown};
use techstore_api::observability::{logging, metrics};
use techstore_api::{store, HttpServer};

#[derive(Parser)]
#[command(name = "techstore-api")]
#[command(about = "E-commerce REST API with shared rate limiting", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "TECHSTORE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        store_backend = ?config.counter_store.backend,
        "Starting TechStore API"
    );

    if config.observability.metrics_enabled {
        // Parse already checked by validation.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let counter_store = store::from_config(&config.counter_store)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, counter_store);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = signals::wait_for_shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
