//! Startup orchestration.
//!
//! # Responsibilities
//! - Own the readiness state and backend endpoint for the process
//! - Load TLS material and bind the listener, then start the monitor and server together
//! - Serve until shutdown, or stop when the monitor reports a fatal error
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Probing starts with the server, after TLS and the listener are in place
//! - A wrong-kind backend path ends serving; the process exits non-zero

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::task::JoinError;

use crate::config::GatewayConfig;
use crate::health::monitor::{AvailabilityMonitor, BackendReady, MonitorError};
use crate::health::state::ReadinessState;
use crate::http::client::BackendClient;
use crate::http::error::GatewayError;
use crate::http::proxy::ProxyEngine;
use crate::http::request::RequestForwarder;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::{bind_listener, load_tls_config, BackendEndpoint, ListenerError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid backend authority: {0}")]
    Authority(#[source] GatewayError),

    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("backend misconfigured: {0}")]
    Backend(#[from] MonitorError),

    #[error("availability monitor aborted: {0}")]
    Monitor(#[source] JoinError),
}

/// The wired-up gateway, not yet running.
pub struct Gateway {
    monitor: AvailabilityMonitor,
    server: HttpServer,
}

impl Gateway {
    /// Build every component from `config`.
    ///
    /// The returned [`BackendReady`] resolves once, with a client for the
    /// backend, when the backend first becomes reachable.
    pub fn new(config: &GatewayConfig) -> Result<(Self, BackendReady), StartupError> {
        let endpoint = BackendEndpoint::new(
            config.backend.socket_path.clone(),
            config.backend.connect_timeout(),
        );
        let (readiness, latch) = ReadinessState::new();
        let (monitor, ready) =
            AvailabilityMonitor::new(endpoint.clone(), config.backend.poll_interval(), latch);

        let forwarder =
            RequestForwarder::new(&config.backend.authority).map_err(StartupError::Authority)?;
        let engine = Arc::new(ProxyEngine::new(
            readiness,
            forwarder,
            BackendClient::new(endpoint),
        ));
        let server = HttpServer::new(
            engine,
            Duration::from_secs(config.listener.shutdown_grace_secs),
        );

        Ok((
            Self { monitor, server },
            ready,
        ))
    }

    /// Start the monitor and serve on `listener` until `shutdown` fires.
    ///
    /// Returns [`StartupError::Backend`] without waiting for a shutdown
    /// signal if the backend path turns out to be the wrong kind of file.
    pub async fn serve(
        self,
        listener: TcpListener,
        tls: Option<RustlsConfig>,
        shutdown: &Shutdown,
    ) -> Result<(), StartupError> {
        let mut monitor = tokio::spawn(self.monitor.run());
        let server = self.server.run(listener, tls, shutdown.subscribe());
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                monitor.abort();
                return result.map_err(StartupError::Serve);
            }
            outcome = &mut monitor => match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Backend availability check failed, stopping");
                    return Err(StartupError::Backend(e));
                }
                Err(e) => return Err(StartupError::Monitor(e)),
            },
        }

        server.await.map_err(StartupError::Serve)
    }
}

/// Load TLS material, bind the listener and run the gateway until shutdown.
pub async fn run(config: GatewayConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let (gateway, ready) = Gateway::new(&config)?;

    tokio::spawn(async move {
        if let Some(client) = ready.wait().await {
            tracing::info!(
                socket = ?client.endpoint().path(),
                "Backend reachable, accepting API traffic"
            );
        }
    });

    let tls = load_tls_config(&config.tls.cert_path, &config.tls.key_path)
        .await
        .map_err(StartupError::Tls)?;
    let listener = bind_listener(&config.listener)?;

    gateway.serve(listener, Some(tls), shutdown).await
}
