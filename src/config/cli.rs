//! Command-line flags.
//!
//! Flags override file and environment configuration. Unknown flags,
//! repeated flags, flags without a value and out-of-range ports are
//! rejected by the parser before anything binds.

use clap::Parser;

use super::Config;

/// Flags for the ingest service.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "crier", version, about = "Secret-gated event ingestion")]
pub struct IngestArgs {
    /// Port to listen on (1-65535).
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Redis location as host:port.
    #[arg(long)]
    pub redis: Option<String>,

    /// Capability secret (6-100 alphanumeric characters). Generated when omitted.
    #[arg(long)]
    pub secret: Option<String>,
}

impl IngestArgs {
    /// Overlay the flags onto a loaded config.
    pub fn apply(self, config: &mut Config) {
        apply_common(config, self.port, self.redis);
        if self.secret.is_some() {
            config.secret = self.secret;
        }
    }
}

/// Flags for the dashboard service.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "crier-dash", version, about = "Live-tail dashboard for crier")]
pub struct DashArgs {
    /// Port to listen on (1-65535).
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Redis location as host:port.
    #[arg(long)]
    pub redis: Option<String>,
}

impl DashArgs {
    /// Overlay the flags onto a loaded config.
    pub fn apply(self, config: &mut Config) {
        apply_common(config, self.port, self.redis);
    }
}

fn apply_common(config: &mut Config, port: Option<u16>, redis: Option<String>) {
    if port.is_some() {
        config.server.port = port;
    }
    if let Some(address) = redis {
        config.storage.redis.address = address;
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_ingest_args_apply() {
        let args = IngestArgs::try_parse_from([
            "crier", "--port", "7001", "--redis", "cache:6380", "--secret", "abcdef12",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.server.port, Some(7001));
        assert_eq!(config.storage.redis.address, "cache:6380");
        assert_eq!(config.secret.as_deref(), Some("abcdef12"));
    }

    #[test]
    fn test_no_args_keeps_config() {
        let args = IngestArgs::try_parse_from(["crier"]).unwrap();

        let mut config = Config::default();
        config.secret = Some("fromfile1".to_string());
        args.apply(&mut config);

        assert!(config.server.port.is_none());
        assert_eq!(config.secret.as_deref(), Some("fromfile1"));
    }

    #[test]
    fn test_duplicate_flag_rejected() {
        let err = IngestArgs::try_parse_from(["crier", "--port", "1", "--port", "2"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = IngestArgs::try_parse_from(["crier", "--verbose", "yes"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_missing_value_rejected() {
        // An odd argument count leaves the last flag without a value.
        assert!(IngestArgs::try_parse_from(["crier", "--port"]).is_err());
        assert!(IngestArgs::try_parse_from(["crier", "--port", "7001", "--redis"]).is_err());
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        assert!(IngestArgs::try_parse_from(["crier", "--port", "0"]).is_err());
        assert!(IngestArgs::try_parse_from(["crier", "--port", "65536"]).is_err());
        assert!(IngestArgs::try_parse_from(["crier", "--port", "http"]).is_err());
    }

    #[test]
    fn test_dash_rejects_secret_flag() {
        let err = DashArgs::try_parse_from(["crier-dash", "--secret", "abcdef12"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
