//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template if the default file is missing.
//!
//! Notes:
//! - This module only reads/writes the config file; value checks live in validate.rs.
//! - Unknown XML fields are rejected so typos surface instead of being ignored.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor, CONFIG_ENV};
use super::types::{Config, LogLevel};
use super::{DEFAULT_CHUNK_SIZE_KIB, DEFAULT_UNSUPPORTED_DELAY_MS};
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    device_root: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    chunk_size_kib: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    unsupported_delay_ms: Option<u64>,
    preserve_timestamps: Option<bool>,
}

// Trims surrounding whitespace for optional u64; blank or garbage values count as unset.
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn non_empty_path(s: Option<&str>) -> Option<PathBuf> {
    s.map(str::trim).filter(|t| !t.is_empty()).map(PathBuf::from)
}

// Map XmlConfig -> Config, starting from defaults.
fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();
    cfg.device_root = non_empty_path(parsed.device_root.as_deref());
    cfg.log_file = non_empty_path(parsed.log_file.as_deref());
    if let Some(level) = parsed
        .log_level
        .as_deref()
        .and_then(|s| s.trim().parse::<LogLevel>().ok())
    {
        cfg.log_level = level;
    }
    if let Some(kib) = parsed.chunk_size_kib {
        cfg.chunk_size = usize::try_from(kib).unwrap_or(usize::MAX / 1024).saturating_mul(1024);
    }
    if let Some(ms) = parsed.unsupported_delay_ms {
        cfg.unsupported_delay = Duration::from_millis(ms);
    }
    cfg.preserve_timestamps = parsed.preserve_timestamps.unwrap_or(false);
    cfg
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(xml_to_config(parsed))
}

/// Outcome of resolving the config file.
#[derive(Debug)]
pub enum LoadResult {
    /// A config file was found and parsed.
    Loaded(PathBuf, Config),
    /// No file existed at the default location; a template was written there.
    CreatedTemplate(PathBuf),
}

/// Load the config file, writing a template at the default location when missing.
///
/// An explicit LUMEN_CONFIG that points at a missing file is an error.
pub fn load_or_init() -> Result<LoadResult> {
    let path = default_config_path()?;
    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(path, cfg));
    }
    if env::var_os(CONFIG_ENV).is_some() {
        bail!(
            "{} points to '{}', which does not exist",
            CONFIG_ENV,
            path.display()
        );
    }
    create_template_config(&path)?;
    Ok(LoadResult::CreatedTemplate(path))
}

/// Create the default template config file and parent directory (best-effort permissions).
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        return Err(anyhow!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/lumen.log".into());

    let content = format!(
        "<!--\n  lumen configuration (XML)\n\n  device_root           -> mount point of the device storage (gvfs/jmtpfs); mtp://X maps to device_root/X\n  log_level             -> quiet | normal | info | debug\n  log_file              -> path to log file (optional; console logging is always on)\n  chunk_size_kib        -> copy chunk size; also how often cancellation is checked\n  unsupported_delay_ms  -> how long a device-to-device request stays busy before finishing\n  preserve_timestamps   -> copy access/modification times onto destinations (true/false)\n\n  CLI flags override XML values.\n-->\n<config>\n  <device_root></device_root>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <chunk_size_kib>{}</chunk_size_kib>\n  <unsupported_delay_ms>{}</unsupported_delay_ms>\n  <preserve_timestamps>false</preserve_timestamps>\n</config>\n",
        suggested_log, DEFAULT_CHUNK_SIZE_KIB, DEFAULT_UNSUPPORTED_DELAY_MS
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}
