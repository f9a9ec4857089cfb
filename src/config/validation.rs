//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, port valid)
//! - Check that addresses and the backend authority parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs once before the config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use hyper::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },

    #[error("listener.port must not be 0")]
    ZeroPort,

    #[error("listener.bind_address {0:?} is not an IP address")]
    InvalidBindAddress(String),

    #[error("{field} must be greater than 0")]
    ZeroDuration { field: &'static str },

    #[error("backend.authority {0:?} is not a valid URI authority")]
    InvalidAuthority(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("observability.log_format {0:?} must be \"pretty\" or \"json\"")]
    InvalidLogFormat(String),
}

/// Check a merged configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.tls.cert_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyPath { field: "tls.cert_path" });
    }
    if config.tls.key_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyPath { field: "tls.key_path" });
    }
    if config.backend.socket_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyPath { field: "backend.socket_path" });
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.listener.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.backend.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "backend.poll_interval_ms" });
    }
    if config.backend.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "backend.connect_timeout_ms" });
    }
    if config.backend.authority.parse::<Authority>().is_err() {
        errors.push(ValidationError::InvalidAuthority(config.backend.authority.clone()));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }
    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::InvalidLogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
