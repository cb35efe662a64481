//! Project dependency graph for slngen
//!
//! This crate links parsed projects through their project references,
//! detects reference cycles without failing on them, and computes the
//! dependency-first order in which solution entries are written.

pub mod cycles;
pub mod graph;
pub mod order;

// Re-export main types
pub use cycles::find_cycles;
pub use graph::{DependencyEdge, DependencyGraph, IdentityMismatch, UnresolvedReference};
pub use order::build_order;

pub use petgraph::graph::NodeIndex;
