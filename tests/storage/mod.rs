//! Shared storage integration tests.
//!
//! Tests the AppendLog interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod append_log_tests;
