//! Bootstrap utilities for crier binaries.
//!
//! Shared initialization code for the ingest and dashboard services.

use std::io::Write;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with CRIER_LOG environment variable.
///
/// Defaults to "info" level if CRIER_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Render the startup quick-reference block.
///
/// Lists the bound port, the process id and, when given, the active secret.
pub fn quick_reference(port: u16, pid: u32, secret: Option<&str>) -> String {
    let mut out = String::from("\n");
    out.push_str(&format!("    Port:    {}\n", port));
    out.push_str(&format!("    PID:     {}\n", pid));
    if let Some(secret) = secret {
        out.push_str(&format!("    Secret:  {}\n", secret));
    }
    out.push('\n');
    out
}

/// Print the quick-reference block to stdout.
pub fn print_quick_reference(port: u16, secret: Option<&str>) {
    let block = quick_reference(port, std::process::id(), secret);
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(block.as_bytes());
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_reference_with_secret() {
        let block = quick_reference(6782, 42, Some("ABCDEFGH"));
        assert!(block.contains("Port:    6782"));
        assert!(block.contains("PID:     42"));
        assert!(block.contains("Secret:  ABCDEFGH"));
    }

    #[test]
    fn test_quick_reference_without_secret() {
        let block = quick_reference(8000, 7, None);
        assert!(block.contains("Port:    8000"));
        assert!(!block.contains("Secret"));
    }
}
