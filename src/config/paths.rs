//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{anyhow, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file (or a directory holding config.xml).
pub const CONFIG_ENV: &str = "LUMEN_CONFIG";

/// Explicit config path from LUMEN_CONFIG, made absolute; directories get config.xml appended.
fn env_config_path() -> Option<PathBuf> {
    let raw = env::var_os(CONFIG_ENV)?;
    if raw.is_empty() {
        return None;
    }
    let mut p = PathBuf::from(raw);
    if p.is_relative()
        && let Ok(cwd) = env::current_dir()
    {
        p = cwd.join(p);
    }
    if p.is_dir() {
        p.push("config.xml");
    }
    Some(p)
}

/// Config path: LUMEN_CONFIG if set, else the OS config dir.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(p) = env_config_path() {
        return Ok(p);
    }
    if let Some(base) = config_dir() {
        return Ok(base.join("lumen").join("config.xml"));
    }
    env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".config").join("lumen").join("config.xml"))
        .ok_or_else(|| anyhow!("cannot determine a config directory (no config dir and HOME unset)"))
}

/// Log path: next to an explicit LUMEN_CONFIG, else the OS data dir.
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(cfg) = env_config_path() {
        let parent = cfg.parent().unwrap_or_else(|| Path::new("."));
        return Ok(parent.join("lumen.log"));
    }
    if let Some(base) = data_dir() {
        return Ok(base.join("lumen").join("lumen.log"));
    }
    env::var_os("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join("lumen")
                .join("lumen.log")
        })
        .ok_or_else(|| anyhow!("cannot determine a data directory (no data dir and HOME unset)"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plain_directories_have_no_symlink_ancestor() {
        let dir = tempdir().unwrap();
        let real = fs::canonicalize(dir.path()).unwrap();
        assert!(!path_has_symlink_ancestor(&real.join("a").join("b.log")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn detects_symlinked_parent() {
        let dir = tempdir().unwrap();
        let real = fs::canonicalize(dir.path()).unwrap();
        let target = real.join("target");
        fs::create_dir_all(&target).unwrap();
        let link = real.join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert!(path_has_symlink_ancestor(&link.join("x.log")).unwrap());
    }
}
