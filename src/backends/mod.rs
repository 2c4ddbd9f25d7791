//! Concrete storage backends and the copy engine they share.

mod copy;
mod device;
mod helpers;
mod local;

pub use copy::{CopyJob, CopyOptions, CopyReport, DEFAULT_CHUNK_SIZE};
pub use device::{is_device_uri, MountedDeviceBackend, DEVICE_SCHEME};
pub use helpers::{build_message, io_error_with_help};
pub use local::LocalBackend;
