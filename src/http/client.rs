//! HTTP/1.1 transport over the backend's Unix socket.
//!
//! # Design Decisions
//! - One connection per request; nothing is pooled
//! - The connection driver is spawned and lives as long as the response body
//! - Dropping the in-flight call (client went away) drops the connection

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;

use crate::http::error::GatewayError;
use crate::net::BackendEndpoint;

/// A client bound to a [`BackendEndpoint`]. Shared read-only across requests.
#[derive(Debug, Clone)]
pub struct BackendClient {
    endpoint: BackendEndpoint,
}

impl BackendClient {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// Send one request over a fresh backend connection and return the
    /// response head with its body still streaming.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, GatewayError> {
        let stream = self
            .endpoint
            .dial()
            .await
            .map_err(GatewayError::BackendConnect)?;

        let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(GatewayError::BackendCall)?;

        let socket = self.endpoint.path().to_path_buf();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(socket = ?socket, error = %e, "Backend connection ended with error");
            }
        });

        sender
            .send_request(request)
            .await
            .map_err(GatewayError::BackendCall)
    }
}
