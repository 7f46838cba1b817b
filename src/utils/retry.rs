//! Retry utilities: backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Backoff for store connection retries at startup.
///
/// - Min delay: 100ms
/// - Max delay: 2s
/// - Max attempts: 5
/// - Jitter enabled
///
/// Exhausting the budget is fatal: the service never serves without a store.
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(5)
        .with_jitter()
}
