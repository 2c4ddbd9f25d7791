//! Direction resolution: which primitive applies to a (source, dest) kind pair.

use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::backend::ProgressSink;
use super::item::{BackendKind, BackendRef, FileItem};
use crate::errors::TransferError;

/// Which primitive a transfer dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local -> device: `dest.upload`.
    Upload,
    /// Device -> local: `source.download`.
    Download,
    /// Local -> local: `source.download` used as a plain copy.
    LocalCopy,
    /// Device -> device: no primitive exists.
    Unsupported,
}

impl Direction {
    pub fn resolve(source: BackendKind, dest: BackendKind) -> Self {
        use BackendKind::*;
        match (source, dest) {
            (Local, DeviceProtocol) => Direction::Upload,
            (DeviceProtocol, Local) => Direction::Download,
            (Local, Local) => Direction::LocalCopy,
            (DeviceProtocol, DeviceProtocol) => Direction::Unsupported,
        }
    }
}

/// Fully resolved operation, ready to run on a blocking worker.
pub(crate) enum Plan {
    Upload {
        backend: BackendRef,
        source: PathBuf,
        dest_dir: String,
    },
    Download {
        backend: BackendRef,
        source: String,
        dest: PathBuf,
        size: u64,
    },
    Unsupported {
        from: BackendKind,
        to: BackendKind,
    },
}

impl Plan {
    pub(crate) fn build(item: &FileItem, source: BackendRef, dest: BackendRef, dest_path: &str) -> Self {
        match Direction::resolve(source.kind(), dest.kind()) {
            Direction::Upload => Plan::Upload {
                backend: dest,
                source: PathBuf::from(item.path()),
                dest_dir: dest_path.to_string(),
            },
            Direction::Download | Direction::LocalCopy => Plan::Download {
                backend: source,
                source: item.path().to_string(),
                dest: PathBuf::from(dest_path).join(item.name()),
                size: item.size(),
            },
            Direction::Unsupported => Plan::Unsupported {
                from: source.kind(),
                to: dest.kind(),
            },
        }
    }

    /// Run the primitive on the current (blocking) thread.
    pub(crate) fn execute(
        self,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        match self {
            Plan::Upload {
                backend,
                source,
                dest_dir,
            } => backend.upload(&source, &dest_dir, progress, cancel),
            Plan::Download {
                backend,
                source,
                dest,
                size,
            } => backend.download(&source, &dest, size, progress, cancel),
            Plan::Unsupported { from, to } => Err(TransferError::UnsupportedDirection { from, to }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BackendKind::*;

    #[test]
    fn resolves_all_four_pairs() {
        assert_eq!(Direction::resolve(Local, DeviceProtocol), Direction::Upload);
        assert_eq!(Direction::resolve(DeviceProtocol, Local), Direction::Download);
        assert_eq!(Direction::resolve(Local, Local), Direction::LocalCopy);
        assert_eq!(Direction::resolve(DeviceProtocol, DeviceProtocol), Direction::Unsupported);
    }
}
