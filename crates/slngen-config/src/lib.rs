//! Configuration loading for slngen
//!
//! This crate handles parsing and validation of slngen.toml files and layers
//! them with global configuration, SLNGEN_* environment variables and
//! command-line overrides into one resolved [`SlnGenConfig`].

pub mod merge;
pub mod settings;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};
pub use settings::{
    BuildListSettings, ConvertSettings, DiscoverySettings, OrphanSettings, SlnGenConfig,
    SolutionSettings,
};
pub use toml::SlnGenToml;

use slngen_core::error::SlnError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SlnError>;

/// File name searched for in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "slngen.toml";
