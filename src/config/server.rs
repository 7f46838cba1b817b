//! Server, drain and live-tail configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default port for the ingest service.
pub const DEFAULT_INGEST_PORT: u16 = 6782;
/// Default port for the dashboard service.
pub const DEFAULT_DASH_PORT: u16 = 8000;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to. Each binary has its own default.
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
        }
    }
}

/// Graceful drain settings.
///
/// On shutdown the server refuses new requests and waits up to
/// `poll_interval_ms * max_polls` for in-flight requests to finish.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            max_polls: 500,
        }
    }
}

impl DrainConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Upper bound on the drain wait.
    pub fn max_wait(&self) -> Duration {
        self.poll_interval() * self.max_polls
    }
}

/// Live-tail settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// Maximum entries fetched per blocking read.
    pub batch_size: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self { batch_size: 25 }
    }
}

/// Dashboard static asset settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Directory holding `index.html` and `js/`.
    pub assets_dir: PathBuf,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("."),
        }
    }
}
