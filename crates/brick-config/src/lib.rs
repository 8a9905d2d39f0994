//! Configuration parsing for brick
//!
//! This crate handles parsing and validation of `brick.toml` manifests and
//! the layered tool settings (global config file, environment, CLI flags).

pub mod settings;
pub mod toml;

// Re-export main types
pub use settings::{ConfigLayering, ConfigLoader, Settings, SettingsOverrides};
pub use self::toml::{
    load_from_file, parse_brick_toml, read_manifest, write_manifest, BrickToml, MANIFEST_FILE,
};

use brick_core::error::BrickError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, BrickError>;
