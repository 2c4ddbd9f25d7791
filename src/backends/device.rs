//! Device backend for storage exposed at a mount point.
//!
//! Protocol-level access (MTP handshake, object handles) is done by the mount
//! provider (gvfs, jmtpfs, ...); this backend only maps device paths onto the
//! mount root. Device paths look like `mtp://DCIM/Camera/x.jpg` or
//! `/DCIM/Camera/x.jpg`; both resolve to `<root>/DCIM/Camera/x.jpg`.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::copy::{CopyJob, CopyOptions};
use super::helpers::io_error_with_help;
use super::local::tree_size;
use crate::errors::TransferError;
use crate::transfer::{BackendKind, FileItem, ProgressSink, StorageBackend};

pub const DEVICE_SCHEME: &str = "mtp://";

/// True when `s` names a location on the device (`mtp://...`).
pub fn is_device_uri(s: &str) -> bool {
    s.len() >= DEVICE_SCHEME.len() && s[..DEVICE_SCHEME.len()].eq_ignore_ascii_case(DEVICE_SCHEME)
}

#[derive(Debug, Clone)]
pub struct MountedDeviceBackend {
    root: PathBuf,
    options: CopyOptions,
}

impl MountedDeviceBackend {
    pub fn new(root: impl Into<PathBuf>, options: CopyOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Device-relative path with the scheme and leading separators removed.
    fn relative(path: &str) -> Result<PathBuf, TransferError> {
        let trimmed = if is_device_uri(path) {
            &path[DEVICE_SCHEME.len()..]
        } else {
            path
        };
        let mut rel = PathBuf::new();
        for comp in Path::new(trimmed.trim_start_matches(['/', '\\'])).components() {
            match comp {
                Component::Normal(c) => rel.push(c),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(TransferError::InvalidPath(path.to_string()));
                }
            }
        }
        Ok(rel)
    }

    /// Map a device path onto the mount root; `..` is refused.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, TransferError> {
        Ok(self.root.join(Self::relative(path)?))
    }
}

impl StorageBackend for MountedDeviceBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DeviceProtocol
    }

    fn upload(
        &self,
        source: &Path,
        dest_dir: &str,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let name = source
            .file_name()
            .ok_or_else(|| TransferError::InvalidPath(source.display().to_string()))?;
        let dest = self.resolve(dest_dir)?.join(name);
        debug!(source = %source.display(), dest = %dest.display(), "Uploading to device");
        CopyJob::new("Uploading", &self.options)
            .run(source, &dest, progress, cancel)
            .map(|_| ())
    }

    fn download(
        &self,
        source: &str,
        dest: &Path,
        size: u64,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let src = self.resolve(source)?;
        debug!(source = %src.display(), dest = %dest.display(), size, "Downloading from device");
        CopyJob::new("Downloading", &self.options)
            .run(&src, dest, progress, cancel)
            .map(|_| ())
    }

    fn stat(&self, path: &str) -> Result<FileItem, TransferError> {
        let rel = Self::relative(path)?;
        let full = self.root.join(&rel);
        let meta = fs::metadata(&full).map_err(io_error_with_help("open item", &full))?;
        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidPath(path.to_string()))?;
        let size = if meta.is_dir() { tree_size(&full) } else { meta.len() };
        let uri = format!(
            "{}{}",
            DEVICE_SCHEME,
            rel.to_string_lossy().replace('\\', "/")
        );
        Ok(FileItem::new(name, uri, size, meta.is_dir(), true))
    }
}
