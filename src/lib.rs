//! TLS reverse proxy in front of a Unix socket backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    SOCKET PROXY                       │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐   ┌─────────────┐   ┌──────────────┐    │
//!   ───────────────────┼─▶│  TLS    │──▶│  readiness  │──▶│   request    │────┼──▶ Backend
//!                      │  │ server  │   │    gate     │   │  forwarder   │    │   (Unix socket)
//!                      │  └─────────┘   └──────▲──────┘   └──────────────┘    │
//!                      │                       │                              │
//!   Client Response    │  ┌──────────────┐     │        ┌──────────────┐      │
//!   ◀──────────────────┼──│ chunked relay│◀────┼────────│ backend conn │◀─────┼─── Backend
//!                      │  └──────────────┘     │        └──────────────┘      │
//!                      │                ┌──────┴───────┐                      │
//!                      │                │ availability │ polls socket path    │
//!                      │                │   monitor    │ until it accepts     │
//!                      │                └──────────────┘                      │
//!                      └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
