//! Abstract interfaces for crier components.
//!
//! These traits define the contract for the durable ordered log the
//! ingest and dashboard services run against.

pub mod append_log;

pub use append_log::{AppendLog, Cursor, Entry, EntryId, LogTail, NewEntry, Result, StorageError};
