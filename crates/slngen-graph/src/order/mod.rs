//! Build ordering
//!
//! Kahn's algorithm with the lowest node index always taken first, so the
//! order is a pure function of corpus order and edges. When every remaining
//! node waits on another one, the graph has a cycle. The sort then picks a
//! strongly connected component whose outside dependencies are all emitted,
//! emits its lowest-index member anyway and resumes.

use crate::graph::ordered_successors;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use tracing::debug;

/// Order nodes so that every node comes after the nodes it points at
pub fn build_order<N, E>(graph: &DiGraph<N, E>) -> Vec<NodeIndex> {
    let count = graph.node_count();

    // dependents[d] lists the nodes that wait on d
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut pending = vec![0usize; count];
    for node in graph.node_indices() {
        let mut distinct = HashSet::new();
        for target in ordered_successors(graph, node) {
            if target != node && distinct.insert(target) {
                dependents[target.index()].push(node.index());
                dependencies[node.index()].push(target.index());
                pending[node.index()] += 1;
            }
        }
    }

    let components = Components::new(graph);
    let mut emitted = vec![false; count];
    let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
        .filter(|i| pending[*i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let next = match ready.pop() {
            Some(Reverse(index)) if emitted[index] => continue,
            Some(Reverse(index)) => index,
            None => {
                // Stuck: break a cycle that waits on nothing outside itself
                let mut remaining = (0..count).filter(|i| !emitted[*i]);
                let Some(index) = remaining
                    .clone()
                    .find(|i| components.is_breakable(*i, &dependencies, &emitted))
                    .or_else(|| remaining.next())
                else {
                    break;
                };
                debug!("Breaking dependency cycle at node {}", index);
                index
            },
        };

        emitted[next] = true;
        order.push(NodeIndex::new(next));
        for dependent in &dependents[next] {
            if emitted[*dependent] {
                continue;
            }
            pending[*dependent] -= 1;
            if pending[*dependent] == 0 {
                ready.push(Reverse(*dependent));
            }
        }
    }

    order
}

/// Strongly connected components, indexed by node
struct Components {
    /// Component of each node
    of: Vec<usize>,
    members: Vec<Vec<usize>>,
    cyclic: Vec<bool>,
}

impl Components {
    fn new<N, E>(graph: &DiGraph<N, E>) -> Self {
        let mut of = vec![0; graph.node_count()];
        let mut members = Vec::new();
        let mut cyclic = Vec::new();
        for (id, component) in tarjan_scc(graph).into_iter().enumerate() {
            cyclic.push(
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|n| graph.contains_edge(*n, *n)),
            );
            for node in &component {
                of[node.index()] = id;
            }
            members.push(component.iter().map(|n| n.index()).collect());
        }
        Self { of, members, cyclic }
    }

    /// A cyclic component every outside dependency of which is already emitted
    fn is_breakable(&self, node: usize, dependencies: &[Vec<usize>], emitted: &[bool]) -> bool {
        let id = self.of[node];
        self.cyclic[id]
            && self.members[id].iter().all(|member| {
                dependencies[*member]
                    .iter()
                    .all(|target| emitted[*target] || self.of[*target] == id)
            })
    }
}
