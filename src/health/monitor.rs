//! Backend availability monitor.
//!
//! # Responsibilities
//! - Poll the backend socket path until it accepts a connection
//! - Fire the readiness latch exactly once
//! - Hand a client for the confirmed endpoint to the follow-on task
//! - Fail hard when the path exists but is not a socket

use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{self, MissedTickBehavior};

use crate::health::state::ReadyLatch;
use crate::http::client::BackendClient;
use crate::net::BackendEndpoint;
use crate::observability::metrics;

/// Unrecoverable monitor failure.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{path:?} exists but is not a socket (found {kind})")]
    NotASocket { path: PathBuf, kind: &'static str },
}

/// Outcome of a single probe that did not end the monitor.
#[derive(Debug)]
enum Probe {
    /// Nothing usable at the path yet.
    Absent(io::Error),
    /// A socket is there but nobody accepted the connection.
    Refused(io::Error),
    Reachable,
}

/// Receiving end of the one-time readiness signal.
#[derive(Debug)]
pub struct BackendReady {
    rx: oneshot::Receiver<BackendClient>,
}

impl BackendReady {
    /// Wait for the backend to become reachable.
    ///
    /// Returns `None` if the monitor stopped without reaching the backend.
    pub async fn wait(self) -> Option<BackendClient> {
        self.rx.await.ok()
    }
}

pub struct AvailabilityMonitor {
    endpoint: BackendEndpoint,
    interval: Duration,
    latch: ReadyLatch,
    ready_tx: oneshot::Sender<BackendClient>,
}

impl AvailabilityMonitor {
    pub fn new(endpoint: BackendEndpoint, interval: Duration, latch: ReadyLatch) -> (Self, BackendReady) {
        let (ready_tx, rx) = oneshot::channel();
        (
            Self {
                endpoint,
                interval,
                latch,
                ready_tx,
            },
            BackendReady { rx },
        )
    }

    /// Poll until the backend accepts a connection.
    ///
    /// Returns `Ok(())` after the transition has fired; the monitor does not
    /// watch the backend afterwards.
    pub async fn run(self) -> Result<(), MonitorError> {
        tracing::info!(
            socket = ?self.endpoint.path(),
            interval_ms = self.interval.as_millis() as u64,
            "Backend availability monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.probe().await? {
                Probe::Absent(e) => {
                    tracing::info!(socket = ?self.endpoint.path(), error = %e, "Waiting for backend socket to appear");
                }
                Probe::Refused(e) => {
                    tracing::warn!(socket = ?self.endpoint.path(), error = %e, "Waiting for backend socket to accept connections");
                }
                Probe::Reachable => break,
            }
        }

        tracing::info!(socket = ?self.endpoint.path(), "Backend socket is ready");
        self.latch.fire();
        metrics::set_backend_ready();

        let client = BackendClient::new(self.endpoint);
        if self.ready_tx.send(client).is_err() {
            tracing::debug!("Nobody is waiting for the backend ready signal");
        }
        Ok(())
    }

    async fn probe(&self) -> Result<Probe, MonitorError> {
        let path = self.endpoint.path();
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) => return Ok(Probe::Absent(e)),
        };

        if !meta.file_type().is_socket() {
            let kind = describe(&meta.file_type());
            tracing::error!(socket = ?path, kind, "Backend path is not a socket");
            return Err(MonitorError::NotASocket {
                path: path.to_path_buf(),
                kind,
            });
        }

        match self.endpoint.dial().await {
            Ok(_stream) => Ok(Probe::Reachable),
            Err(e) => Ok(Probe::Refused(e)),
        }
    }
}

fn describe(file_type: &std::fs::FileType) -> &'static str {
    if file_type.is_dir() {
        "directory"
    } else if file_type.is_file() {
        "regular file"
    } else if file_type.is_fifo() {
        "fifo"
    } else if file_type.is_char_device() || file_type.is_block_device() {
        "device"
    } else {
        "other"
    }
}
