//! Storage implementations.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::AppendLog;

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryAppendLog;

#[cfg(feature = "redis")]
pub use self::redis::RedisAppendLog;

/// Initialize the append log based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn AppendLog>, Box<dyn std::error::Error>> {
    match config.storage_type {
        #[cfg(feature = "redis")]
        StorageType::Redis => {
            let url = config.redis.url();
            info!(storage = %config.storage_type, url = %url, stream = %config.redis.stream_key, "Storage");
            let log = RedisAppendLog::new(&url, Some(&config.redis.stream_key))
                .await
                .map_err(|e| {
                    error!(url = %url, error = %e, "Failed to connect to redis");
                    e
                })?;
            Ok(Arc::new(log))
        }
        #[cfg(not(feature = "redis"))]
        StorageType::Redis => {
            error!("Redis storage requested but 'redis' feature is not enabled");
            Err("Redis feature not enabled".into())
        }
        StorageType::Memory => {
            info!(storage = %config.storage_type, "Storage");
            Ok(Arc::new(MemoryAppendLog::new()))
        }
    }
}
