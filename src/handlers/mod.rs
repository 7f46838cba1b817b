//! HTTP and WebSocket handlers.
//!
//! - `ingest`: secret-gated message submission
//! - `tail`: live-tail WebSocket broadcaster
//! - `message`: full message fetch by id
//! - `dash`: dashboard router (tail, fetch, static assets)

pub mod dash;
pub mod ingest;
pub mod message;
pub mod tail;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, TailConfig};
use crate::interfaces::AppendLog;
use crate::server::ConnectionTracker;

/// Shared application context, built once at startup.
pub struct AppContext {
    /// Shared store handle.
    pub log: Arc<dyn AppendLog>,
    /// Drain accounting for every inbound request.
    pub tracker: Arc<ConnectionTracker>,
    /// Live-tail settings.
    pub tail: TailConfig,
    /// Dashboard asset directory.
    pub assets_dir: PathBuf,
}

impl AppContext {
    pub fn new(log: Arc<dyn AppendLog>, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            log,
            tracker: ConnectionTracker::new(),
            tail: config.tail.clone(),
            assets_dir: config.dash.assets_dir.clone(),
        })
    }
}
