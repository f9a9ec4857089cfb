//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with health and proxy handlers
//! - Wire up middleware (per-request tracing span with request ID)
//! - Serve over TLS (or plain HTTP when no TLS config is given)
//! - Drain connections on shutdown

use std::io;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::http::proxy::ProxyEngine;
use crate::http::request::API_PREFIX;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
}

/// Public HTTPS server for the gateway.
pub struct HttpServer {
    router: Router,
    shutdown_grace: Duration,
}

impl HttpServer {
    pub fn new(engine: Arc<ProxyEngine>, shutdown_grace: Duration) -> Self {
        let router = Self::build_router(AppState { engine });
        Self {
            router,
            shutdown_grace,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/livez", get(livez))
            .route("/readyz", get(readyz))
            .route("/api/v1", any(api_root_redirect))
            .route("/api/v1/", any(proxy_handler))
            .route("/api/v1/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new().layer(TraceLayer::new_for_http().make_span_with(
                    |request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            request_id = %Uuid::new_v4(),
                            method = %request.method(),
                            path = %request.uri().path(),
                        )
                    },
                )),
            )
    }

    /// Run the server on `listener` until `shutdown` fires.
    ///
    /// `tls` of `None` serves plain HTTP.
    pub async fn run(
        self,
        listener: TcpListener,
        tls: Option<RustlsConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        let handle = Handle::new();

        let drain = handle.clone();
        let grace = self.shutdown_grace;
        tokio::spawn(async move {
            if let Err(broadcast::error::RecvError::Closed) = shutdown.recv().await {
                return;
            }
            tracing::info!(grace_secs = grace.as_secs(), "Draining connections");
            drain.graceful_shutdown(Some(grace));
        });

        let app = self.router.into_make_service();
        match tls {
            Some(tls) => {
                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::tls_rustls::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::warn!(address = %addr, "HTTP server starting without TLS");
                axum_server::from_tcp(listener)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn livez(State(state): State<AppState>) -> StatusCode {
    if state.engine.is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn readyz(State(state): State<AppState>) -> StatusCode {
    if state.engine.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// `/api/v1` answers with a permanent redirect to `/api/v1/`, query kept.
async fn api_root_redirect(uri: Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{API_PREFIX}?{query}"),
        None => API_PREFIX.to_string(),
    };
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.engine.handle(request).await
}
