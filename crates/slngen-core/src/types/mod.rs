//! Core data types for slngen.
//!
//! This module provides the fundamental types used throughout the workspace:
//! - Project descriptors parsed from MSBuild project files
//! - References between projects and assemblies
//! - Configuration/platform pairs

pub mod configuration;
pub mod project;
pub mod reference;

// Re-export all public types
pub use configuration::{BuildConfiguration, UnsupportedConfigPolicy};
pub use project::{
    IdOrigin, OutputKind, OutputPathEntry, ProjectDescriptor, ProjectId, ProjectKind, SourceItem,
};
pub use reference::{Reference, ReferenceKind};
