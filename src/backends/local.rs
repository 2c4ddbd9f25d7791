//! Local filesystem backend.
//! Downloads are plain local copies; uploads are not accepted (nothing is "remote" here).

use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

use super::copy::{CopyJob, CopyOptions};
use super::helpers::io_error_with_help;
use crate::errors::TransferError;
use crate::transfer::{BackendKind, FileItem, ProgressSink, StorageBackend};

#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    options: CopyOptions,
}

impl LocalBackend {
    pub fn new(options: CopyOptions) -> Self {
        Self { options }
    }
}

impl StorageBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn upload(
        &self,
        _source: &Path,
        dest_dir: &str,
        _progress: ProgressSink<'_>,
        _cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        Err(TransferError::backend(format!(
            "the local filesystem does not accept uploads (destination '{dest_dir}'); local copies use download"
        )))
    }

    fn download(
        &self,
        source: &str,
        dest: &Path,
        size: u64,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        debug!(source, dest = %dest.display(), size, "Local copy");
        CopyJob::new("Copying", &self.options)
            .run(Path::new(source), dest, progress, cancel)
            .map(|_| ())
    }

    fn stat(&self, path: &str) -> Result<FileItem, TransferError> {
        let p = Path::new(path);
        let real = dunce::canonicalize(p).map_err(io_error_with_help("open item", p))?;
        let meta = fs::metadata(&real).map_err(io_error_with_help("stat item", &real))?;
        let name = real
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidPath(path.to_string()))?;
        let size = if meta.is_dir() { tree_size(&real) } else { meta.len() };
        Ok(FileItem::new(
            name,
            real.to_string_lossy(),
            size,
            meta.is_dir(),
            false,
        ))
    }
}

/// Sum of regular file sizes below `dir` (unreadable entries are skipped).
pub(crate) fn tree_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}
