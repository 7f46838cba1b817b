//! HTTP serving with graceful drain.
//!
//! Shutdown sequence once the termination signal fires:
//! 1. refuse new requests with 503
//! 2. wait, bounded, for in-flight requests to finish
//! 3. stop accepting connections and let admitted ones complete
//! 4. return once the listener is fully closed

pub mod drain;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use drain::{track_requests, ConnectionTracker, DrainOutcome, RequestGuard};

use crate::config::DrainConfig;

/// Wrap a router with request tracing and drain accounting.
pub fn instrument(router: Router, tracker: Arc<ConnectionTracker>) -> Router {
    router
        .layer(axum::middleware::from_fn_with_state(tracker, track_requests))
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `signal` completes, then drain.
///
/// Returns an error only when the server fails to close cleanly.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    tracker: Arc<ConnectionTracker>,
    drain: DrainConfig,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");

    let app = instrument(router, Arc::clone(&tracker));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        tracker.drain(&drain).await;
        info!("Closing listener");
    })
    .await?;

    info!("Web server closed");
    Ok(())
}

/// Listen for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
