//! Output rendering for slngen
//!
//! Turns a [`slngen_graph::DependencyGraph`] into the two artifacts of a
//! build run: a Visual Studio solution file with explicit project
//! dependencies, and a DGML view of the same graph. Both renderers are pure
//! functions of the graph and their options; writing goes through the atomic
//! writer of `slngen-core`.

pub mod dgml;
pub mod solution;

// Re-export main types
pub use dgml::{dgml_path, DgmlWriter};
pub use solution::{ConfigurationMapping, SolutionOptions, SolutionWriter};
