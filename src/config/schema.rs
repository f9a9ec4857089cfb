//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public listener (bind address, port).
    pub listener: ListenerConfig,

    /// TLS material for the public listener.
    pub tls: TlsConfig,

    /// Backend socket and readiness polling.
    pub backend: BackendConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// TCP port for the public HTTPS endpoint.
    pub port: u16,

    /// How long in-flight connections may drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 443,
            shutdown_grace_secs: 10,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("server.crt"),
            key_path: PathBuf::from("server.key"),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Filesystem path of the backend's Unix socket.
    pub socket_path: PathBuf,

    /// Authority sent as `Host` on forwarded requests.
    pub authority: String,

    /// Interval between availability probes in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound on a single socket dial in milliseconds.
    pub connect_timeout_ms: u64,
}

impl BackendConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/backend.sock"),
            authority: "localhost".to_string(),
            poll_interval_ms: 200,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Prometheus exporter bind address. Metrics are not exported when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_address: None,
        }
    }
}
