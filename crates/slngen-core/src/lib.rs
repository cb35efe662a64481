//! # slngen-core
//!
//! Core types and utilities shared across all slngen crates.
//!
//! This crate provides:
//! - ProjectDescriptor, Reference and BuildConfiguration types describing parsed projects
//! - SlnError enum for unified error handling
//! - Diagnostics for recoverable, per-item conditions collected during a run
//! - Path normalization and stable identity helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (ProjectDescriptor, ProjectId, etc.)
//! - `error`: Error types and result aliases
//! - `diagnostics`: Aggregated run diagnostics
//! - `utils`: Utility functions and helpers

pub mod diagnostics;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{SlnError, SlnResult};
pub use types::{
    BuildConfiguration, IdOrigin, OutputKind, ProjectDescriptor, ProjectId, ProjectKind,
    Reference, ReferenceKind, SourceItem, UnsupportedConfigPolicy,
};
