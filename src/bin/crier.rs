//! crier: secret-gated event ingestion.
//!
//! Accepts `/<secret>/<base32(message)>` over HTTP and appends each decoded
//! message, with the submitter's address, to the shared log.
//!
//! ## Configuration
//! ```yaml
//! server:
//!   port: 6782
//! storage:
//!   type: redis
//!   redis:
//!     address: localhost:6379
//!     stream_key: crier
//! secret: changeme42
//! ```
//!
//! Flags (`--port`, `--redis`, `--secret`) override file and environment.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use crier::config::{Config, IngestArgs, DEFAULT_INGEST_PORT};
use crier::handlers::ingest::{self, IngestState};
use crier::handlers::AppContext;
use crier::server;
use crier::storage::init_storage;
use crier::utils::bootstrap::{init_tracing, print_quick_reference};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = IngestArgs::parse();

    let mut config = Config::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    args.apply(&mut config);

    let secret = config.resolve_secret().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;
    let port = config.port_or(DEFAULT_INGEST_PORT).map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    let log = init_storage(&config.storage).await?;
    let ctx = AppContext::new(log, &config);

    let addr = format!("{}:{}", config.server.host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        error!(%addr, error = %e, "Failed to bind");
        e
    })?;

    print_quick_reference(port, Some(secret.as_str()));
    info!(port = %port, "crier started");

    let router = ingest::router(IngestState::new(&ctx, &secret));
    server::serve(
        listener,
        router,
        ctx.tracker.clone(),
        config.drain.clone(),
        server::shutdown_signal(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Server failed to close cleanly");
        e
    })?;

    Ok(())
}
