//! Dependency graph implementation using petgraph
//!
//! Nodes are the parsed projects in corpus order; an edge points from the
//! referencing project to the project it references. References that match
//! no project are kept as [`UnresolvedReference`] records.

use crate::cycles::find_cycles;
use crate::order::build_order;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::SlnError;
use slngen_core::types::{ProjectDescriptor, ProjectId, Reference};
use slngen_core::utils::path::path_key;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Edge in the dependency graph representing one project reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// `Include` of the reference that produced the edge
    pub include: String,
}

/// A project reference that matched no project of the corpus
#[derive(Debug, Clone)]
pub struct UnresolvedReference {
    pub from: NodeIndex,
    pub reference: Reference,
    /// Where the include points on disk
    pub target_path: PathBuf,
}

/// A reference whose GUID and include path name different projects.
///
/// The edge follows the GUID; the project at the include path is kept for
/// reporting.
#[derive(Debug, Clone)]
pub struct IdentityMismatch {
    pub from: NodeIndex,
    /// Project the GUID resolved to
    pub resolved: NodeIndex,
    /// Project found at the include path
    pub named: NodeIndex,
    pub include: String,
}

/// Projects linked by their project references
#[derive(Debug)]
pub struct DependencyGraph {
    /// Underlying directed graph
    graph: DiGraph<ProjectDescriptor, DependencyEdge>,
    /// Map from lowercase path key to NodeIndex
    by_path: HashMap<String, NodeIndex>,
    unresolved: Vec<UnresolvedReference>,
    mismatches: Vec<IdentityMismatch>,
    cycles: Vec<Vec<NodeIndex>>,
    reference_count: usize,
}

/// Successors of `node` in edge insertion order.
///
/// petgraph walks a node's edge list newest first, so the edges are sorted
/// by index to keep traversal deterministic.
pub fn ordered_successors<N, E>(graph: &DiGraph<N, E>, node: NodeIndex) -> Vec<NodeIndex> {
    let mut edges: Vec<_> = graph.edges(node).map(|e| (e.id(), e.target())).collect();
    edges.sort_by_key(|(id, _)| *id);
    edges.into_iter().map(|(_, target)| target).collect()
}

impl DependencyGraph {
    /// Build the graph in one pass over the projects
    pub fn build(projects: Vec<ProjectDescriptor>) -> Self {
        let mut graph = DiGraph::with_capacity(projects.len(), projects.len());
        let mut by_id: HashMap<ProjectId, NodeIndex> = HashMap::new();
        let mut by_path = HashMap::new();

        for project in projects {
            let id = project.id;
            let key = path_key(&project.path);
            let index = graph.add_node(project);
            by_id.entry(id).or_insert(index);
            by_path.entry(key).or_insert(index);
        }

        let mut edges = Vec::new();
        let mut unresolved = Vec::new();
        let mut mismatches = Vec::new();
        let mut reference_count = 0;

        for index in graph.node_indices() {
            let project = &graph[index];
            for reference in project.project_references() {
                reference_count += 1;
                let target_path = project.resolve_include(&reference.include);
                let by_guid = reference.project_guid.and_then(|guid| by_id.get(&guid).copied());
                let at_path = by_path.get(&path_key(&target_path)).copied();
                if let (Some(resolved), Some(named)) = (by_guid, at_path) {
                    if resolved != named {
                        mismatches.push(IdentityMismatch {
                            from: index,
                            resolved,
                            named,
                            include: reference.include.clone(),
                        });
                    }
                }
                let target = by_guid.or(at_path);

                match target {
                    Some(target) => edges.push((
                        index,
                        target,
                        DependencyEdge {
                            include: reference.include.clone(),
                        },
                    )),
                    None => unresolved.push(UnresolvedReference {
                        from: index,
                        reference: reference.clone(),
                        target_path,
                    }),
                }
            }
        }

        for (from, to, edge) in edges {
            graph.add_edge(from, to, edge);
        }

        let cycles = find_cycles(&graph);
        info!(
            "Dependency graph: {} projects, {} edges, {} unresolved, {} cycles",
            graph.node_count(),
            graph.edge_count(),
            unresolved.len(),
            cycles.len()
        );

        Self {
            graph,
            by_path,
            unresolved,
            mismatches,
            cycles,
            reference_count,
        }
    }

    /// Projects in corpus order
    pub fn projects(&self) -> impl Iterator<Item = &ProjectDescriptor> {
        self.graph.node_weights()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn project(&self, index: NodeIndex) -> &ProjectDescriptor {
        &self.graph[index]
    }

    /// Get project by path, ignoring case
    pub fn get_by_path(&self, path: &std::path::Path) -> Option<&ProjectDescriptor> {
        self.by_path.get(&path_key(path)).map(|index| &self.graph[*index])
    }

    /// Distinct dependencies of a project, self references excluded, in
    /// reference order
    pub fn dependencies(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut result: Vec<NodeIndex> = Vec::new();
        for target in ordered_successors(&self.graph, index) {
            if target != index && !result.contains(&target) {
                result.push(target);
            }
        }
        result
    }

    /// All edges as (dependent, dependency), in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        self.graph.edge_references().map(|e| (e.source(), e.target()))
    }

    pub fn unresolved(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }

    /// References resolved by GUID to a different project than their path names
    pub fn identity_mismatches(&self) -> &[IdentityMismatch] {
        &self.mismatches
    }

    /// Detected cycles, each listed in traversal order
    pub fn cycles(&self) -> &[Vec<NodeIndex>] {
        &self.cycles
    }

    /// Check if an edge closes on itself through a detected cycle
    pub fn is_cyclic_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.cycles
            .iter()
            .any(|cycle| cycle.contains(&from) && cycle.contains(&to))
    }

    /// Dependency-first order of all projects; cycles are broken deterministically
    pub fn build_order(&self) -> Vec<NodeIndex> {
        build_order(&self.graph)
    }

    /// Format cycle as "A -> B -> C -> A"
    pub fn format_cycle(&self, cycle: &[NodeIndex]) -> String {
        let mut names: Vec<&str> = cycle.iter().map(|i| self.graph[*i].name.as_str()).collect();
        if let Some(first) = names.first().copied() {
            names.push(first);
        }
        names.join(" -> ")
    }

    /// Record unresolved references, identity mismatches and cycles
    pub fn report(&self, diagnostics: &mut Diagnostics) {
        for unresolved in &self.unresolved {
            let from = &self.graph[unresolved.from];
            let error = SlnError::UnresolvedReference {
                from: from.name.clone(),
                target: unresolved.reference.include.clone(),
            };
            warn!("{}", error);
            diagnostics.record_error(DiagnosticKind::UnresolvedReference, from.name.clone(), &error);
        }

        for mismatch in &self.mismatches {
            let from = &self.graph[mismatch.from];
            let resolved = &self.graph[mismatch.resolved];
            let named = &self.graph[mismatch.named];
            warn!(
                "{} references {} by GUID {}, but the include names {}",
                from.name, resolved.name, resolved.id, named.name
            );
            diagnostics.record(
                DiagnosticKind::DuplicateIdentity,
                from.name.clone(),
                format!(
                    "{} resolves by GUID to {} instead of {}",
                    mismatch.include,
                    resolved.path.display(),
                    named.path.display()
                ),
            );
        }

        for cycle in &self.cycles {
            let error = SlnError::CycleDetected {
                cycle: self.format_cycle(cycle),
            };
            warn!("{}", error);
            diagnostics.record_error(DiagnosticKind::CycleDetected, self.format_cycle(cycle), &error);
        }
    }

    /// Get number of projects in the graph
    pub fn project_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of resolved references in the graph
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of project references seen, resolved or not
    pub fn reference_count(&self) -> usize {
        self.reference_count
    }
}
