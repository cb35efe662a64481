//! Utility functions and helpers.
//!
//! Common functionality used across multiple slngen crates.

pub mod fs;
pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use fs::write_atomic;
pub use hash::stable_uuid;
pub use path::{item_key, msbuild_to_native, normalize_path, path_key, relative_msbuild_path};
