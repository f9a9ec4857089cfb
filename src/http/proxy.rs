//! Readiness-gated proxy engine.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → readiness gate (503 when not ready, nothing else happens)
//!     → request.rs (build backend request)
//!     → client.rs (dial socket, send)
//!     → response.rs (copy head, relay body chunk by chunk)
//! ```

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;

use crate::health::state::ReadinessState;
use crate::http::client::BackendClient;
use crate::http::error::GatewayError;
use crate::http::request::RequestForwarder;
use crate::http::response::relay_response;
use crate::observability::metrics;

/// Per-request composition of forwarder, backend call and relay.
#[derive(Debug, Clone)]
pub struct ProxyEngine {
    readiness: ReadinessState,
    forwarder: RequestForwarder,
    client: BackendClient,
}

impl ProxyEngine {
    pub fn new(readiness: ReadinessState, forwarder: RequestForwarder, client: BackendClient) -> Self {
        Self {
            readiness,
            forwarder,
            client,
        }
    }

    /// Liveness: the process is up and serving.
    pub fn is_live(&self) -> bool {
        true
    }

    /// Readiness: the backend has been reached at least once.
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Proxy one inbound request, turning every pre-stream failure into a
    /// response.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        tracing::info!(method = %method, path = %path, "Received request");

        let response = match self.proxy(request).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    GatewayError::NotReady => {
                        tracing::debug!(path = %path, "Rejecting request, backend not ready");
                    }
                    GatewayError::InvalidTarget { .. } => {
                        tracing::warn!(path = %path, error = %e, "Failed to create backend request");
                    }
                    GatewayError::BackendConnect(_) | GatewayError::BackendCall(_) => {
                        tracing::error!(path = %path, error = %e, "Failed to send request to backend");
                    }
                }
                e.into_response()
            }
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), start);
        response
    }

    async fn proxy(&self, request: Request<Body>) -> Result<Response<Body>, GatewayError> {
        if !self.readiness.is_ready() {
            return Err(GatewayError::NotReady);
        }

        let outbound = self.forwarder.forward(request)?;
        tracing::debug!(
            method = %outbound.method(),
            target = %outbound.uri(),
            socket = ?self.client.endpoint().path(),
            "Sending request to backend"
        );

        let response = self.client.send(outbound).await?;
        Ok(relay_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::BackendEndpoint;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UnixListener;

    /// An engine whose socket path has a listener counting accepted connections.
    fn engine_with_counter(
        dir: &tempfile::TempDir,
    ) -> (ProxyEngine, crate::health::state::ReadyLatch, Arc<AtomicUsize>) {
        let path = dir.path().join("backend.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            while let Ok((_stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let (readiness, latch) = ReadinessState::new();
        let engine = ProxyEngine::new(
            readiness,
            RequestForwarder::new("localhost").unwrap(),
            BackendClient::new(BackendEndpoint::new(path, Duration::from_secs(1))),
        );
        (engine, latch, accepted)
    }

    #[tokio::test]
    async fn not_ready_rejects_without_contacting_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _latch, accepted) = engine_with_counter(&dir);

        for method in ["GET", "POST", "DELETE"] {
            let request = Request::builder()
                .method(method)
                .uri("/api/v1/anything")
                .body(Body::empty())
                .unwrap();
            let response = engine.handle(request).await;
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(accepted.load(Ordering::SeqCst), 0);
        assert!(engine.is_live());
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn invalid_target_is_bad_gateway_without_contacting_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, latch, accepted) = engine_with_counter(&dir);
        latch.fire();

        let request = Request::builder()
            .uri("/api/v1/../../livez")
            .body(Body::empty())
            .unwrap();
        let response = engine.handle(request).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(accepted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_backend_after_readiness_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let (readiness, latch) = ReadinessState::new();
        let engine = ProxyEngine::new(
            readiness,
            RequestForwarder::new("localhost").unwrap(),
            BackendClient::new(BackendEndpoint::new(
                dir.path().join("gone.sock"),
                Duration::from_secs(1),
            )),
        );
        latch.fire();

        let request = Request::builder()
            .uri("/api/v1/echo")
            .body(Body::empty())
            .unwrap();
        let response = engine.handle(request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
