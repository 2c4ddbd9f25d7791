#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lumen::{BackendKind, BackendRef, FileItem, PendingTransfer, Progress, StorageBackend, TransferError};
use lumen::transfer::ProgressSink;
use tokio_util::sync::CancellationToken;

/// A primitive invocation seen by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { source: PathBuf, dest_dir: String },
    Download { source: String, dest: PathBuf, size: u64 },
}

/// What a primitive does once invoked.
#[derive(Clone)]
pub enum Script {
    /// Report each fraction (status "step N") then succeed.
    Succeed(Vec<f64>),
    /// Fail immediately with a backend I/O error.
    Fail(&'static str),
    /// Report each fraction, then wait for `release` (or cancellation) and succeed.
    Hold(Vec<f64>, Arc<AtomicBool>),
    /// Wait for cancellation, then report a late 0.9 and return Ok.
    IgnoreCancel,
    /// Report 0.3, then give up with `Cancelled` although nobody cancelled.
    AbortOnItsOwn,
}

pub struct ScriptedBackend {
    kind: BackendKind,
    script: Script,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new(kind: BackendKind, script: Script) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn play(&self, progress: ProgressSink<'_>, cancel: &CancellationToken) -> Result<(), TransferError> {
        match &self.script {
            Script::Succeed(steps) => {
                emit(steps, progress);
                Ok(())
            }
            Script::Fail(msg) => Err(TransferError::backend(*msg)),
            Script::Hold(steps, release) => {
                emit(steps, progress);
                while !release.load(Ordering::SeqCst) && !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(2));
                }
                Ok(())
            }
            Script::IgnoreCancel => {
                progress(Progress::new(0.2, "working"));
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(2));
                }
                progress(Progress::new(0.9, "late update"));
                Ok(())
            }
            Script::AbortOnItsOwn => {
                progress(Progress::new(0.3, "working"));
                Err(TransferError::Cancelled)
            }
        }
    }
}

fn emit(steps: &[f64], progress: ProgressSink<'_>) {
    for (i, f) in steps.iter().enumerate() {
        progress(Progress::new(*f, format!("step {}", i + 1)));
    }
}

impl StorageBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn upload(
        &self,
        source: &Path,
        dest_dir: &str,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        self.calls.lock().unwrap().push(Call::Upload {
            source: source.to_path_buf(),
            dest_dir: dest_dir.to_string(),
        });
        self.play(progress, cancel)
    }

    fn download(
        &self,
        source: &str,
        dest: &Path,
        size: u64,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        self.calls.lock().unwrap().push(Call::Download {
            source: source.to_string(),
            dest: dest.to_path_buf(),
            size,
        });
        self.play(progress, cancel)
    }

    fn stat(&self, path: &str) -> Result<FileItem, TransferError> {
        Err(TransferError::NotFound(PathBuf::from(path)))
    }
}

pub fn pending(name: &str, path: &str, size: u64, source: &Arc<ScriptedBackend>) -> PendingTransfer {
    let remote = source.kind().is_remote();
    let backend: BackendRef = source.clone();
    PendingTransfer::new(FileItem::new(name, path, size, false, remote), backend)
}

pub fn as_ref(b: &Arc<ScriptedBackend>) -> BackendRef {
    b.clone()
}

/// Bound on how long any test waits for the orchestrator.
pub const WAIT: Duration = Duration::from_secs(10);
