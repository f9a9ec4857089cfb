//! Public TCP listener binding.

use std::net::{IpAddr, SocketAddr, TcpListener};

use thiserror::Error;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Bind address is not an IP address.
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),

    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind the public listener described by `config`.
///
/// The socket is switched to non-blocking mode so it can be handed to the
/// async server.
pub fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let ip: IpAddr = config
        .bind_address
        .parse()
        .map_err(|_| ListenerError::InvalidAddress(config.bind_address.clone()))?;
    let addr = SocketAddr::new(ip, config.port);

    let listener = TcpListener::bind(addr).map_err(|source| ListenerError::Bind { addr, source })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(address = %addr, "Listener bound");
    Ok(listener)
}
