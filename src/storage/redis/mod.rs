//! Redis storage implementations.

mod append_log;

pub use append_log::{RedisAppendLog, HOST_FIELD, MESSAGE_FIELD};
