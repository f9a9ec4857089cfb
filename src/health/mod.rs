//! Backend readiness subsystem.
//!
//! # Data Flow
//! ```text
//! Availability monitor (monitor.rs):
//!     Fixed-interval timer
//!     → Inspect socket path (absent / wrong kind / socket)
//!     → Dial the socket
//!     → Fire the readiness latch once, signal the follow-on task
//!
//! State (state.rs):
//!     NotReady → Ready (terminal)
//!     Read by every proxied request and by /readyz
//! ```
//!
//! # Design Decisions
//! - The backend is never re-checked after it became ready
//! - A wrong-kind path is fatal rather than retried

pub mod monitor;
pub mod state;

pub use monitor::{AvailabilityMonitor, BackendReady, MonitorError};
pub use state::{ReadinessState, ReadyLatch};
