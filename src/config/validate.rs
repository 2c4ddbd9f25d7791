//! Config validation logic.
//! Verifies the device mount root and the copy tunables before any transfer starts.

use anyhow::{bail, Context, Result};
use std::fs;
use tracing::{debug, error, info};

use super::types::Config;
use super::MAX_CHUNK_SIZE_KIB;

impl Config {
    /// Validate value ranges and, when configured, the device mount root.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size_kib must be greater than zero");
        }
        if self.chunk_size > MAX_CHUNK_SIZE_KIB * 1024 {
            bail!(
                "chunk_size_kib must be at most {} (got {})",
                MAX_CHUNK_SIZE_KIB,
                self.chunk_size / 1024
            );
        }

        if let Some(root) = &self.device_root {
            if !root.exists() {
                error!("device_root does not exist: {}", root.display());
                bail!(
                    "device_root does not exist: {} (is the device mounted?)",
                    root.display()
                );
            }
            if !root.is_dir() {
                error!("device_root is not a directory: {}", root.display());
                bail!("device_root is not a directory: {}", root.display());
            }
            fs::read_dir(root).with_context(|| {
                format!("Cannot read device_root '{}'; check permissions", root.display())
            })?;
            debug!("device_root readable: {}", root.display());
        }

        info!(
            device_root = %self
                .device_root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".into()),
            chunk_size = self.chunk_size,
            "Config validated"
        );
        Ok(())
    }
}
