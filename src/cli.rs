//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - An `mtp://` prefix selects the device backend; `--from` / `--to` override the guess.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::backends::is_device_uri;
use crate::config::types::{Config, LogLevel};
use crate::transfer::BackendKind;

/// Move a file or folder between this computer and a mounted device.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Transfer a file or folder between this computer and a device, with live progress"
)]
pub struct Args {
    /// Item to transfer: a local path, or mtp://path for an item on the device.
    #[arg(
        value_name = "SOURCE",
        value_hint = ValueHint::AnyPath,
        required_unless_present = "print_config"
    )]
    pub source: Option<String>,

    /// Destination directory: a local path, or mtp://path on the device.
    #[arg(
        value_name = "DEST_DIR",
        value_hint = ValueHint::AnyPath,
        required_unless_present = "print_config"
    )]
    pub dest: Option<String>,

    /// Backend the source lives on (local | device); guessed from SOURCE when omitted.
    #[arg(long, value_parser = parse_kind, help = "Source backend: local or device")]
    pub from: Option<BackendKind>,

    /// Backend of the destination (local | device); guessed from DEST_DIR when omitted.
    #[arg(long, value_parser = parse_kind, help = "Destination backend: local or device")]
    pub to: Option<BackendKind>,

    /// Override the device mount root (normally configured via XML).
    #[arg(long, value_hint = ValueHint::DirPath, help = "Mount point of the device storage")]
    pub device_root: Option<PathBuf>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long, value_hint = ValueHint::FilePath, help = "Append logs to this file")]
    pub log_file: Option<PathBuf>,

    /// Print where lumen will look for the config file, then exit.
    #[arg(long, help = "Print the config file location used by lumen and exit")]
    pub print_config: bool,

    /// Copy access/modification times onto the destination.
    #[arg(long, help = "Preserve timestamps on copied files")]
    pub preserve_timestamps: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,
}

fn parse_kind(s: &str) -> Result<BackendKind, String> {
    BackendKind::parse(s).ok_or_else(|| format!("unknown backend '{s}' (expected local or device)"))
}

/// Backend implied by a path: `mtp://` means the device, anything else is local.
fn guess_kind(path: &str) -> BackendKind {
    if is_device_uri(path) {
        BackendKind::DeviceProtocol
    } else {
        BackendKind::Local
    }
}

impl Args {
    /// Source path with stray shell quotes removed.
    pub fn source_path(&self) -> Option<String> {
        self.source.as_deref().map(sanitize_str)
    }

    pub fn dest_path(&self) -> Option<String> {
        self.dest.as_deref().map(sanitize_str)
    }

    pub fn source_kind(&self) -> BackendKind {
        self.from
            .unwrap_or_else(|| guess_kind(self.source.as_deref().unwrap_or_default()))
    }

    pub fn dest_kind(&self) -> BackendKind {
        self.to
            .unwrap_or_else(|| guess_kind(self.dest.as_deref().unwrap_or_default()))
    }

    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(root) = &self.device_root {
            cfg.device_root = Some(root.clone());
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(file) = &self.log_file {
            cfg.log_file = Some(file.clone());
        }
        if self.preserve_timestamps {
            cfg.preserve_timestamps = true;
        }
    }
}

/// Trim surrounding quotes left over from PowerShell/CMD or copy-paste.
fn sanitize_str(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.trim_matches(|c| c == '\'' || c == '"').to_string()
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_matching_quotes() {
        assert_eq!(sanitize_str("\"/tmp/a b\""), "/tmp/a b");
        assert_eq!(sanitize_str("'/tmp/x'"), "/tmp/x");
        assert_eq!(sanitize_str("  /tmp/y  "), "/tmp/y");
        assert_eq!(sanitize_str("/tmp/z'"), "/tmp/z");
    }

    #[test]
    fn guess_kind_from_scheme() {
        assert_eq!(guess_kind("mtp://DCIM"), BackendKind::DeviceProtocol);
        assert_eq!(guess_kind("/home/me/Pictures"), BackendKind::Local);
    }
}
