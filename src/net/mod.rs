//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Public side:
//!     listener.rs (bind TCP port)
//!     → tls.rs (load certificate + key for the HTTPS server)
//!     → Hand off to HTTP layer
//!
//! Backend side:
//!     unix.rs (socket path + dial timeout)
//!     → dialed by the availability monitor and by every proxied request
//! ```

pub mod listener;
pub mod tls;
pub mod unix;

pub use listener::{bind_listener, ListenerError};
pub use tls::load_tls_config;
pub use unix::BackendEndpoint;
