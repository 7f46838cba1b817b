//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables, then
//! overridden by command-line flags.

mod cli;
mod server;
mod storage;

pub use cli::{DashArgs, IngestArgs};
pub use server::{
    DashConfig, DrainConfig, ServerConfig, TailConfig, DEFAULT_DASH_PORT, DEFAULT_INGEST_PORT,
};
pub use storage::{
    RedisConfig, StorageConfig, StorageType, DEFAULT_REDIS_ADDRESS, DEFAULT_STREAM_KEY,
};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "crier.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CRIER_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CRIER";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CRIER_LOG";

use serde::Deserialize;

use crate::gate::{GateError, Secret};

/// Errors that make the process exit before it binds.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid secret: {0}")]
    InvalidSecret(#[from] GateError),

    #[error("Port number out of range")]
    PortOutOfRange,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Graceful drain configuration.
    pub drain: DrainConfig,
    /// Live-tail configuration.
    pub tail: TailConfig,
    /// Dashboard asset configuration.
    pub dash: DashConfig,
    /// Operator-supplied capability secret (ingest only).
    pub secret: Option<String>,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `crier.yaml` in current directory (if exists)
    /// 2. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 3. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load() -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Port to bind, falling back to the binary's default.
    pub fn port_or(&self, default: u16) -> Result<u16, ConfigError> {
        match self.server.port {
            Some(0) => Err(ConfigError::PortOutOfRange),
            Some(port) => Ok(port),
            None => Ok(default),
        }
    }

    /// Validate the configured secret, or generate one when none is set.
    pub fn resolve_secret(&self) -> Result<Secret, ConfigError> {
        match &self.secret {
            Some(value) => Ok(Secret::parse(value)?),
            None => Ok(Secret::generate()),
        }
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.storage.storage_type = StorageType::Memory;
        config
    }
}
