//! Chunked, cancellable copy engine shared by the concrete backends.
//!
//! Features:
//! - Each file is streamed into a hidden temp sibling (created with O_EXCL
//!   semantics), synced, then renamed into place; a failed or cancelled copy
//!   never leaves a half-written destination behind.
//! - The cancellation token is checked between chunks.
//! - Directory trees are copied file by file; progress is weighted by bytes
//!   across the whole tree.
//! - Free space at the destination is checked up front (best effort).
//!
//! Existing destinations are replaced; conflict handling is left to callers.

use filetime::{set_file_times, FileTime};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::helpers::io_error_with_help;
use crate::errors::TransferError;
use crate::transfer::{Progress, ProgressSink, RateMeter};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Longest slice of the final name kept in a temp file name, in bytes.
/// The suffix adds about 50 bytes and NAME_MAX is 255 on common filesystems.
const TEMP_NAME_MAX: usize = 100;

/// Tunables for the copy engine.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Bytes read per chunk; also the cancellation granularity.
    pub chunk_size: usize,
    /// Copy access/modification times onto the destination.
    pub preserve_timestamps: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            preserve_timestamps: false,
        }
    }
}

/// Summary of a finished copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    pub files: u64,
    pub bytes: u64,
}

struct FileJob {
    src: PathBuf,
    dest: PathBuf,
    len: u64,
}

/// Copies one item (file or directory tree) while reporting progress.
pub struct CopyJob<'a> {
    verb: &'a str,
    options: &'a CopyOptions,
}

impl<'a> CopyJob<'a> {
    /// `verb` prefixes the status text, e.g. "Uploading" -> "Uploading photo.jpg".
    pub fn new(verb: &'a str, options: &'a CopyOptions) -> Self {
        Self { verb, options }
    }

    pub fn run(
        &self,
        src: &Path,
        dest: &Path,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<CopyReport, TransferError> {
        let meta = fs::metadata(src).map_err(io_error_with_help("open source", src))?;

        let (jobs, dirs) = if meta.is_dir() {
            plan_tree(src, dest)?
        } else {
            let job = FileJob {
                src: src.to_path_buf(),
                dest: dest.to_path_buf(),
                len: meta.len(),
            };
            (vec![job], Vec::new())
        };
        let total: u64 = jobs.iter().map(|j| j.len).sum();

        let dest_parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dest_parent)
            .map_err(io_error_with_help("create destination directory", dest_parent))?;
        check_free_space(dest_parent, total)?;

        for dir in &dirs {
            fs::create_dir_all(dir).map_err(io_error_with_help("create directory", dir))?;
        }

        let mut meter = RateMeter::new(total);
        let mut done: u64 = 0;
        for job in &jobs {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            self.copy_file(job, total, &mut done, &mut meter, progress, cancel)?;
        }

        progress(Progress::new(1.0, format!("{} complete", self.verb)));
        info!(
            src = %src.display(),
            dest = %dest.display(),
            files = jobs.len(),
            bytes = done,
            elapsed_ms = meter.elapsed().as_millis() as u64,
            "Copy finished"
        );
        Ok(CopyReport {
            files: jobs.len() as u64,
            bytes: done,
        })
    }

    fn copy_file(
        &self,
        job: &FileJob,
        total: u64,
        done: &mut u64,
        meter: &mut RateMeter,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let name = job
            .src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let status = format!("{} {}", self.verb, name);
        let dest_dir = job.dest.parent().unwrap_or_else(|| Path::new("."));
        let tmp = temp_sibling(dest_dir, &name);

        let result = self.stream_into(job, &tmp, &status, total, done, meter, progress, cancel);
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            if matches!(e, TransferError::Cancelled) {
                debug!(tmp = %tmp.display(), "Removed partial file after cancellation");
            }
            return Err(e);
        }

        // Windows: rename does not replace an existing file.
        #[cfg(windows)]
        if job.dest.is_file() {
            let _ = fs::remove_file(&job.dest);
        }

        if let Err(e) = fs::rename(&tmp, &job.dest) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error_with_help("move temporary file into place", &job.dest)(e));
        }

        if self.options.preserve_timestamps {
            preserve_times(&job.src, &job.dest);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn stream_into(
        &self,
        job: &FileJob,
        tmp: &Path,
        status: &str,
        total: u64,
        done: &mut u64,
        meter: &mut RateMeter,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let mut reader = File::open(&job.src).map_err(io_error_with_help("open source", &job.src))?;
        let out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(tmp)
            .map_err(io_error_with_help("create temporary file", tmp))?;
        let mut writer = BufWriter::with_capacity(self.options.chunk_size, out);

        let mut buf = vec![0u8; self.options.chunk_size.max(1)];
        let mut copied: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let n = reader
                .read(&mut buf)
                .map_err(io_error_with_help("read chunk", &job.src))?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buf[..n])
                .map_err(io_error_with_help("write chunk", tmp))?;
            copied += n as u64;
            *done += n as u64;

            let (speed, eta) = meter.sample(*done);
            progress(Progress::new(fraction(*done, total), status).with_rate(speed, eta));
        }

        writer.flush().map_err(io_error_with_help("flush", tmp))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(io_error_with_help("sync", tmp))?;

        if copied != job.len {
            // Source changed while copying; keep what was read.
            warn!(src = %job.src.display(), expected = job.len, copied, "Source size changed during copy");
        }
        Ok(())
    }
}

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}

/// Collect files (with sizes) and directories under `src`, mapped onto `dest`.
fn plan_tree(src: &Path, dest: &Path) -> Result<(Vec<FileJob>, Vec<PathBuf>), TransferError> {
    let mut jobs = Vec::new();
    let mut dirs = Vec::new();
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            TransferError::backend(format!("walk '{}': {}", src.display(), e))
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| TransferError::backend(e.to_string()))?;
        let target = dest.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            dirs.push(target);
        } else if ft.is_file() {
            let len = entry
                .metadata()
                .map(|m| m.len())
                .map_err(|e| TransferError::backend(format!("stat '{}': {}", entry.path().display(), e)))?;
            jobs.push(FileJob {
                src: entry.into_path(),
                dest: target,
                len,
            });
        } else {
            debug!(path = %entry.path().display(), "Skipping non-regular entry");
        }
    }
    Ok((jobs, dirs))
}

fn temp_sibling(dir: &Path, name: &str) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut cut = name.len().min(TEMP_NAME_MAX);
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    dir.join(format!(".{}.lumen.{pid}.{nanos}.{seq}.part", &name[..cut]))
}

/// Fail early when the destination filesystem clearly cannot hold `required` bytes.
fn check_free_space(dir: &Path, required: u64) -> Result<(), TransferError> {
    match fs2::available_space(dir) {
        Ok(available) if available < required => Err(TransferError::InsufficientSpace {
            required,
            available,
            dest: dir.to_path_buf(),
        }),
        Ok(_) => Ok(()),
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Free space check unavailable");
            Ok(())
        }
    }
}

fn preserve_times(src: &Path, dest: &Path) {
    let Ok(meta) = fs::metadata(src) else {
        return;
    };
    let at = meta.accessed().ok().map(FileTime::from_system_time);
    let mt = meta.modified().ok().map(FileTime::from_system_time);
    if let (Some(at), Some(mt)) = (at, mt)
        && let Err(e) = set_file_times(dest, at, mt)
    {
        debug!(dest = %dest.display(), error = %e, "Could not preserve timestamps");
    }
}
