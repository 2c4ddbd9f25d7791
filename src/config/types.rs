//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{DEFAULT_CHUNK_SIZE_KIB, DEFAULT_UNSUPPORTED_DELAY_MS};
use crate::backends::CopyOptions;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for the transfer tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Mount point of the device's storage (gvfs, jmtpfs, ...)
    pub device_root: Option<PathBuf>,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Copy chunk size in bytes
    pub chunk_size: usize,
    /// How long the unsupported device-to-device placeholder stays busy
    pub unsupported_delay: Duration,
    /// Copy access/modification times onto destinations
    pub preserve_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_root: None,
            log_level: LogLevel::Normal,
            log_file: None,
            chunk_size: DEFAULT_CHUNK_SIZE_KIB * 1024,
            unsupported_delay: Duration::from_millis(DEFAULT_UNSUPPORTED_DELAY_MS),
            preserve_timestamps: false,
        }
    }
}

impl Config {
    /// Copy engine settings derived from this config.
    pub fn copy_options(&self) -> CopyOptions {
        CopyOptions {
            chunk_size: self.chunk_size,
            preserve_timestamps: self.preserve_timestamps,
        }
    }
}
