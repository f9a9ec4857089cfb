//! Backend endpoint addressed by a Unix socket path.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixStream;
use tokio::time;

/// The backend's local address and how to dial it.
///
/// Immutable after construction and cheap to clone; the monitor and every
/// in-flight request hold their own copy.
#[derive(Debug, Clone)]
pub struct BackendEndpoint {
    path: PathBuf,
    connect_timeout: Duration,
}

impl BackendEndpoint {
    pub fn new(path: impl Into<PathBuf>, connect_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            connect_timeout,
        }
    }

    /// Filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection to the backend socket.
    pub async fn dial(&self) -> io::Result<UnixStream> {
        match time::timeout(self.connect_timeout, UnixStream::connect(&self.path)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!(
                    "connecting to {} timed out after {:?}",
                    self.path.display(),
                    self.connect_timeout
                ),
            )),
        }
    }
}
