//! Cycle detection
//!
//! Depth-first search with white/gray/black colouring. Every back edge to a
//! node still on the stack closes one cycle; the cycle's members are the
//! stack slice from that node to the top. Cycles with the same membership are
//! reported once.

use crate::graph::ordered_successors;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    next: usize,
}

impl Frame {
    fn new<N, E>(graph: &DiGraph<N, E>, node: NodeIndex) -> Self {
        Self {
            node,
            successors: ordered_successors(graph, node),
            next: 0,
        }
    }
}

/// Find cycles, listed in traversal order starting from the node the search
/// entered first. Roots are visited in node order; self loops count.
pub fn find_cycles<N, E>(graph: &DiGraph<N, E>) -> Vec<Vec<NodeIndex>> {
    let mut color = vec![Color::White; graph.node_count()];
    let mut cycles = Vec::new();
    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();

    for root in graph.node_indices() {
        if color[root.index()] != Color::White {
            continue;
        }

        // Iterative to stay off the call stack for deep reference chains
        let mut stack = vec![Frame::new(graph, root)];
        let mut path = vec![root];
        color[root.index()] = Color::Gray;

        while let Some(frame) = stack.last_mut() {
            if frame.next == frame.successors.len() {
                color[frame.node.index()] = Color::Black;
                stack.pop();
                path.pop();
                continue;
            }

            let target = frame.successors[frame.next];
            frame.next += 1;

            match color[target.index()] {
                Color::White => {
                    color[target.index()] = Color::Gray;
                    path.push(target);
                    stack.push(Frame::new(graph, target));
                },
                Color::Gray => {
                    if let Some(start) = path.iter().position(|n| *n == target) {
                        let members = path[start..].to_vec();
                        let mut key = members.clone();
                        key.sort();
                        if seen.insert(key) {
                            cycles.push(members);
                        }
                    }
                },
                Color::Black => {},
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(count: usize, edges: &[(usize, usize)]) -> DiGraph<(), ()> {
        let mut graph = DiGraph::new();
        let nodes: Vec<_> = (0..count).map(|_| graph.add_node(())).collect();
        for (from, to) in edges {
            graph.add_edge(nodes[*from], nodes[*to], ());
        }
        graph
    }

    fn indices(cycle: &[NodeIndex]) -> Vec<usize> {
        cycle.iter().map(|n| n.index()).collect()
    }

    #[test]
    fn test_no_cycles() {
        let g = graph(4, &[(1, 0), (2, 0), (3, 1), (3, 2)]);
        assert!(find_cycles(&g).is_empty());
    }

    #[test]
    fn test_simple_cycle() {
        let g = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let cycles = find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(indices(&cycles[0]), vec![0, 1, 2]);
    }

    #[test]
    fn test_self_loop() {
        let g = graph(2, &[(0, 1), (1, 1)]);
        let cycles = find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(indices(&cycles[0]), vec![1]);
    }

    #[test]
    fn test_disjoint_cycles() {
        let g = graph(5, &[(0, 1), (1, 0), (2, 3), (3, 4), (4, 2)]);
        let cycles = find_cycles(&g);
        assert_eq!(cycles.len(), 2);
        assert_eq!(indices(&cycles[0]), vec![0, 1]);
        assert_eq!(indices(&cycles[1]), vec![2, 3, 4]);
    }

    #[test]
    fn test_duplicate_edges_report_once() {
        let g = graph(2, &[(0, 1), (1, 0), (1, 0)]);
        assert_eq!(find_cycles(&g).len(), 1);
    }

    #[test]
    fn test_deep_chain() {
        let count = 50_000;
        let edges: Vec<_> = (0..count - 1).map(|i| (i, i + 1)).chain([(count - 1, 0)]).collect();
        let g = graph(count, &edges);
        let cycles = find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), count);
    }
}
