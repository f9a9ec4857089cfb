//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection
//!     → server.rs (Axum router: /livez, /readyz, /api/v1/*)
//!     → proxy.rs (readiness gate, per-request composition)
//!     → request.rs (build backend request)
//!     → client.rs (HTTP/1.1 over the Unix socket)
//!     → response.rs (copy head, relay body chunk by chunk)
//!     → Send to client
//! ```

pub mod client;
pub mod error;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use client::BackendClient;
pub use error::GatewayError;
pub use proxy::ProxyEngine;
pub use request::RequestForwarder;
pub use response::{ChunkedRelay, RelayError, RELAY_CHUNK_SIZE};
pub use server::HttpServer;
