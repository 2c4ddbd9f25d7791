//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor, CONFIG_ENV};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config_from_xml_path, load_or_init, LoadResult};

/// Defaults shared across submodules.
pub const DEFAULT_CHUNK_SIZE_KIB: usize = 1024;
pub const DEFAULT_UNSUPPORTED_DELAY_MS: u64 = 2000;
/// Largest accepted chunk; bigger chunks make cancellation sluggish.
pub const MAX_CHUNK_SIZE_KIB: usize = 64 * 1024;
