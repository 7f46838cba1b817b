//! Crier - secret-gated event ingestion with a live-tail dashboard.
//!
//! Producers submit short text events over HTTP, authorized by a capability
//! secret embedded in the URL path. Dashboard consumers watch those events
//! live over a WebSocket, resuming from any point in the append-only log.
//!
//! ## Architecture
//! ```text
//! [producer] -> SecretGate -> Ingestor -> AppendLog.append
//!                                              |
//! [dashboard] <- LiveTailBroadcaster <- AppendLog.read_after (blocking)
//! ```
//!
//! Every inbound request passes through the `ConnectionTracker`, which
//! drives graceful drain on shutdown.

pub mod config;
pub mod gate;
pub mod handlers;
pub mod interfaces;
pub mod server;
pub mod storage;
pub mod utils;
