//! I/O error helpers.
//!
//! Enrich io::Error with the operation, the path and a platform-aware hint,
//! then fold it into a `TransferError` suitable for the user-facing status.
//!
//! Usage:
//!   File::open(p).map_err(io_error_with_help("open source", p))?;

use std::io;
use std::path::{Path, PathBuf};

use crate::errors::TransferError;

/// Format "op 'path': error: hint [os code: N]".
pub fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);

    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            match code {
                libc::EACCES | libc::EPERM => {
                    msg.push_str(": permission denied; check ownership and write permissions.");
                }
                libc::EBUSY => {
                    msg.push_str(": resource busy; the device may be locked or in use.");
                }
                libc::ENOENT => {
                    msg.push_str(": path not found; verify it exists.");
                }
                libc::ENOSPC => {
                    msg.push_str(": insufficient space on device.");
                }
                libc::EROFS => {
                    msg.push_str(": read-only filesystem; cannot write here.");
                }
                libc::EIO => {
                    msg.push_str(": I/O error; the device may have been disconnected.");
                }
                libc::ENAMETOOLONG => {
                    msg.push_str(": filename or path too long; shorten path segments.");
                }
                _ => {}
            }
        }
        #[cfg(windows)]
        {
            match code {
                5 => msg.push_str(": access denied; check permissions."),
                32 => msg.push_str(": sharing violation; file is in use."),
                2 | 3 => msg.push_str(": path not found; verify it exists."),
                112 => msg.push_str(": insufficient disk space."),
                19 => msg.push_str(": write protected / read-only media."),
                _ => {}
            }
        }
        msg.push_str(&format!(" [os code: {}]", code));
    } else {
        match e.kind() {
            io::ErrorKind::PermissionDenied => {
                msg.push_str(": permission denied; check ownership and write permissions.");
            }
            io::ErrorKind::NotFound => {
                msg.push_str(": path not found; verify it exists.");
            }
            _ => {}
        }
    }

    msg
}

/// Adapter for `.map_err(...)`: io::Error -> TransferError.
///
/// A missing path becomes `NotFound`; everything else is a `BackendIo` message.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> TransferError + 'a {
    move |e: io::Error| {
        if e.kind() == io::ErrorKind::NotFound && op.starts_with("open") {
            TransferError::NotFound(PathBuf::from(path))
        } else {
            TransferError::BackendIo(build_message(op, path, &e))
        }
    }
}
