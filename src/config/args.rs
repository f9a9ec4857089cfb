//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "socket-proxy")]
#[command(version, about = "TLS reverse proxy in front of a Unix socket backend", long_about = None)]
pub struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to server certificate (PEM)
    #[arg(long = "tls-cert")]
    pub tls_cert: Option<PathBuf>,

    /// Path to server private key (PEM)
    #[arg(long = "tls-key")]
    pub tls_key: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the backend Unix socket
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Merge defaults, the config file and flags (in that order) and validate
    /// the result.
    pub fn resolve(self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(cert) = self.tls_cert {
            config.tls.cert_path = cert;
        }
        if let Some(key) = self.tls_key {
            config.tls.key_path = key;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(socket) = self.socket {
            config.backend.socket_path = socket;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[listener]\nport = 8443\n\n[backend]\nsocket_path = \"/run/from-file.sock\""
        )
        .unwrap();

        let args = Args::try_parse_from([
            "socket-proxy",
            "--config",
            file.path().to_str().unwrap(),
            "--socket",
            "/run/from-flag.sock",
        ])
        .unwrap();

        let config = args.resolve().unwrap();
        assert_eq!(config.listener.port, 8443);
        assert_eq!(config.backend.socket_path, PathBuf::from("/run/from-flag.sock"));
    }

    #[test]
    fn invalid_flag_fails_validation() {
        let args = Args::try_parse_from(["socket-proxy", "--port", "0"]).unwrap();
        assert!(matches!(args.resolve(), Err(ConfigError::Validation(_))));
    }
}
