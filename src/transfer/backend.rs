//! The capability contract every storage backend implements.
//!
//! Backends perform blocking I/O; the orchestrator always calls them from a
//! blocking worker, never from the caller's thread. The progress sink is
//! borrowed only for the duration of a call, so a backend cannot report
//! progress after it has returned.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::item::{BackendKind, FileItem};
use crate::errors::TransferError;

/// One progress report from a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Completed fraction in [0.0, 1.0].
    pub fraction: f64,
    /// Human-readable phase, e.g. "Copying photo.jpg".
    pub status: String,
    pub speed: Option<String>,
    pub time_remaining: Option<String>,
}

impl Progress {
    pub fn new(fraction: f64, status: impl Into<String>) -> Self {
        Self {
            fraction,
            status: status.into(),
            speed: None,
            time_remaining: None,
        }
    }

    pub fn with_rate(mut self, speed: Option<String>, time_remaining: Option<String>) -> Self {
        self.speed = speed;
        self.time_remaining = time_remaining;
        self
    }
}

/// Progress callback handed to backend primitives.
pub type ProgressSink<'a> = &'a mut (dyn FnMut(Progress) + Send);

pub trait StorageBackend: Send + Sync {
    /// Backend identity; must not perform I/O.
    fn kind(&self) -> BackendKind;

    /// Copy the local-filesystem item at `source` into the directory `dest_dir`
    /// of this backend. Only meaningful for device backends.
    fn upload(
        &self,
        source: &Path,
        dest_dir: &str,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError>;

    /// Copy the item at `source` (of known `size`) from this backend to the
    /// local-filesystem path `dest`.
    fn download(
        &self,
        source: &str,
        dest: &Path,
        size: u64,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError>;

    /// Describe the item at `path` on this backend.
    fn stat(&self, path: &str) -> Result<FileItem, TransferError>;
}
