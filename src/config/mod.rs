//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file)
//!     → args.rs (command-line overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod args;
pub mod loader;
pub mod schema;
pub mod validation;

pub use args::Args;
pub use loader::ConfigError;
pub use schema::{BackendConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, TlsConfig};
