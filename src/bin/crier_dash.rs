//! crier-dash: live-tail dashboard.
//!
//! Serves the dashboard page and scripts, streams new log entries to each
//! browser over `/ws`, and returns full messages from `/message/{id}`.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use crier::config::{Config, DashArgs, DEFAULT_DASH_PORT};
use crier::handlers::{dash, AppContext};
use crier::server;
use crier::storage::init_storage;
use crier::utils::bootstrap::{init_tracing, print_quick_reference};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = DashArgs::parse();

    let mut config = Config::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    args.apply(&mut config);
    let port = config.port_or(DEFAULT_DASH_PORT).map_err(|e| {
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

    print_quick_reference(port, None);
    info!(port = %port, assets = %config.dash.assets_dir.display(), "crier-dash started");

    server::serve(
        listener,
        dash::router(ctx.clone()),
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
