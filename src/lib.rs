//! Core library for `lumen`.
//!
//! Moves a single file or directory between the local filesystem and a device
//! backend while publishing progress. The orchestration core lives in
//! [`transfer`]; [`backends`] holds the concrete local and mounted-device
//! backends; config, CLI and output helpers support the binary.

pub mod backends;
pub mod cli;
pub mod config;
pub mod errors;
pub mod output;
pub mod platform;
pub mod transfer;

pub use backends::{is_device_uri, CopyOptions, LocalBackend, MountedDeviceBackend};
pub use config::{default_config_path, default_log_path, path_has_symlink_ancestor, Config, LogLevel};
pub use errors::TransferError;
pub use transfer::{
    BackendKind, BackendRef, FileItem, PendingTransfer, Progress, StorageBackend, TransferOrchestrator,
    TransferPhase, TransferState,
};
