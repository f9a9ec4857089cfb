//! Backend readiness state.
//!
//! # States
//! - NotReady: the backend socket has not accepted a connection yet
//! - Ready: a connection succeeded once; terminal for the process lifetime
//!
//! # State Transitions
//! ```text
//! NotReady → Ready: ReadyLatch::fire (exactly once)
//! ```
//!
//! # Design Decisions
//! - Readers and the writer are distinct handles created together
//! - The writer is consumed when it fires, so there is no path back to NotReady
//! - A single atomic flag; no lock since there is one writer and many readers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Read handle on the process-wide readiness flag.
#[derive(Debug, Clone)]
pub struct ReadinessState {
    ready: Arc<AtomicBool>,
}

impl ReadinessState {
    /// Create a not-ready state together with its only writer.
    pub fn new() -> (Self, ReadyLatch) {
        let ready = Arc::new(AtomicBool::new(false));
        (
            Self {
                ready: Arc::clone(&ready),
            },
            ReadyLatch { ready },
        )
    }

    /// Whether the backend has been confirmed reachable.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// The single writer of a [`ReadinessState`].
///
/// Not `Clone`; [`ReadyLatch::fire`] takes `self`.
#[derive(Debug)]
pub struct ReadyLatch {
    ready: Arc<AtomicBool>,
}

impl ReadyLatch {
    /// Flip readiness to true.
    pub fn fire(self) {
        let was_ready = self.ready.swap(true, Ordering::AcqRel);
        debug_assert!(!was_ready, "readiness latch fired twice");
        tracing::info!("Backend marked ready");
    }
}
