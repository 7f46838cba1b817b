//! Storage configuration types.

use serde::Deserialize;

/// Default Redis location (`host:port`).
pub const DEFAULT_REDIS_ADDRESS: &str = "localhost:6379";

/// Default stream key holding the entries.
pub const DEFAULT_STREAM_KEY: &str = "crier";

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Redis,
    Memory,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Redis => write!(f, "redis"),
            StorageType::Memory => write!(f, "memory"),
        }
    }
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Redis-specific configuration.
    pub redis: RedisConfig,
}

/// Redis-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis location, either `host:port` or a full `redis://` URL.
    pub address: String,
    /// Stream key holding the entries.
    pub stream_key: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_REDIS_ADDRESS.to_string(),
            stream_key: DEFAULT_STREAM_KEY.to_string(),
        }
    }
}

impl RedisConfig {
    /// Connection URL for the configured address.
    pub fn url(&self) -> String {
        if self.address.starts_with("redis://") || self.address.starts_with("rediss://") {
            self.address.clone()
        } else {
            format!("redis://{}/0", self.address)
        }
    }
}
