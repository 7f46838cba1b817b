//! In-flight request accounting and graceful drain.
//!
//! Every request is admitted through [`ConnectionTracker::try_enter`], which
//! hands out a guard that decrements the in-flight count when dropped, on
//! every exit path including unwinding and cancellation. Once draining
//! starts, new requests are refused with 503.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::DrainConfig;

/// Process-wide drain state.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    in_flight: AtomicU64,
    rejecting: AtomicBool,
    idle: Notify,
}

/// How a drain wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The in-flight count reached zero.
    Idle,
    /// The bounded wait elapsed with requests still in flight.
    TimedOut { in_flight: u64 },
}

impl ConnectionTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_rejecting(&self) -> bool {
        self.rejecting.load(Ordering::SeqCst)
    }

    /// Admit a request, or `None` when draining.
    ///
    /// The count is raised before the flag is re-checked, so a drain that
    /// reads zero can never miss a request admitted concurrently. A request
    /// refused on the re-check gives its slot back before returning.
    pub fn try_enter(self: &Arc<Self>) -> Option<RequestGuard> {
        if self.is_rejecting() {
            return None;
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = RequestGuard {
            tracker: Arc::clone(self),
        };
        if self.is_rejecting() {
            drop(guard);
            return None;
        }
        Some(guard)
    }

    fn exit(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Refuse all further requests.
    pub fn begin_drain(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    /// Wait for the in-flight count to reach zero, bounded by
    /// `config.max_wait()`.
    ///
    /// Wakes on the zero transition and also re-checks every poll interval.
    pub async fn wait_idle(&self, config: &DrainConfig) -> DrainOutcome {
        let interval = config.poll_interval();
        let wait = async {
            loop {
                let notified = self.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                let _ = tokio::time::timeout(interval, notified).await;
            }
        };

        match tokio::time::timeout(config.max_wait(), wait).await {
            Ok(()) => DrainOutcome::Idle,
            Err(_) => DrainOutcome::TimedOut {
                in_flight: self.in_flight(),
            },
        }
    }

    /// Set the reject flag, then wait for admitted requests to finish.
    pub async fn drain(&self, config: &DrainConfig) -> DrainOutcome {
        self.begin_drain();
        info!(in_flight = self.in_flight(), "Draining connections");

        let outcome = self.wait_idle(config).await;
        match outcome {
            DrainOutcome::Idle => info!("All in-flight requests finished"),
            DrainOutcome::TimedOut { in_flight } => warn!(
                in_flight,
                waited = ?config.max_wait(),
                "Drain wait elapsed with requests still in flight"
            ),
        }
        outcome
    }
}

/// Holds one in-flight slot; releases it on drop.
#[derive(Debug)]
pub struct RequestGuard {
    tracker: Arc<ConnectionTracker>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.tracker.exit();
    }
}

/// Axum middleware wrapping every request in drain accounting.
///
/// Install with `axum::middleware::from_fn_with_state(tracker, track_requests)`.
pub async fn track_requests(
    State(tracker): State<Arc<ConnectionTracker>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(_guard) = tracker.try_enter() else {
        debug!(uri = %request.uri(), "Rejecting request while draining");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    next.run(request).await
}
