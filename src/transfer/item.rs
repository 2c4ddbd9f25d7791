//! Transfer values: backend identity, file items and the pending (marked) transfer.

use std::fmt;
use std::sync::Arc;

use super::backend::StorageBackend;

/// Structural identity of a backend, used to resolve transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The host's own filesystem.
    Local,
    /// A device reached through a vendor transfer protocol (e.g. MTP).
    DeviceProtocol,
}

impl BackendKind {
    pub fn is_remote(self) -> bool {
        matches!(self, BackendKind::DeviceProtocol)
    }

    /// Parse user-facing names ("local", "device", "mtp"); case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "host" => Some(BackendKind::Local),
            "device" | "mtp" | "remote" => Some(BackendKind::DeviceProtocol),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::DeviceProtocol => f.write_str("device"),
        }
    }
}

/// A file or directory as seen by one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    name: String,
    path: String,
    size: u64,
    is_directory: bool,
    is_remote: bool,
}

impl FileItem {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        is_directory: bool,
        is_remote: bool,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            is_directory,
            is_remote,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend-relative identifier.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }
}

/// Shared handle to a backend. Backends outlive any single transfer.
pub type BackendRef = Arc<dyn StorageBackend>;

/// An item bound to the backend it currently lives on, awaiting a destination.
#[derive(Clone)]
pub struct PendingTransfer {
    item: FileItem,
    source: BackendRef,
}

impl PendingTransfer {
    pub fn new(item: FileItem, source: BackendRef) -> Self {
        Self { item, source }
    }

    pub fn item(&self) -> &FileItem {
        &self.item
    }

    pub fn source(&self) -> &BackendRef {
        &self.source
    }

    pub(crate) fn into_parts(self) -> (FileItem, BackendRef) {
        (self.item, self.source)
    }
}

impl fmt::Debug for PendingTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransfer")
            .field("item", &self.item)
            .field("source", &self.source.kind())
            .finish()
    }
}
