//! Per-request error taxonomy and its mapping to client responses.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures that happen before any response byte reaches the client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Backend reachability has not been confirmed yet.
    #[error("backend is not ready")]
    NotReady,

    /// The inbound target cannot be mapped into the backend namespace.
    #[error("cannot forward {path}: {reason}")]
    InvalidTarget { path: String, reason: String },

    /// Dialing the backend socket failed.
    #[error("failed to connect to backend: {0}")]
    BackendConnect(#[source] std::io::Error),

    /// The HTTP exchange with the backend failed.
    #[error("backend request failed: {0}")]
    BackendCall(#[source] hyper::Error),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InvalidTarget { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::BackendConnect(_) | GatewayError::BackendCall(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            GatewayError::NotReady => Body::empty(),
            other => Body::from(format!("{}\n", other)),
        };
        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
