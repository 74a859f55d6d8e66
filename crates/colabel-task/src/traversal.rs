//! Breadth-first traversal order over an episode's nodes.
//!
//! The order is computed once per episode and reused read-only by every
//! pass. Hyperedges expand fully: every other endpoint of an incident edge
//! counts as a neighbor. When the frontier runs dry before all nodes are
//! visited (disconnected graph, or a component unreachable from node 0),
//! the lowest-indexed untouched node seeds the next component.

use colabel_core::feature::Example;
use colabel_core::graph::{edge_endpoints, EpisodeGraph};
use colabel_core::id::NodeId;

/// Returns a permutation of `0..node_count` covering every node exactly
/// once, breadth-first from node 0.
pub fn breadth_first_order(graph: &EpisodeGraph, examples: &[Example]) -> Vec<NodeId> {
    let n = graph.node_count();
    let mut order = Vec::with_capacity(n);
    if n == 0 {
        return order;
    }

    let mut touched = vec![false; n];
    touched[0] = true;
    order.push(NodeId(0));

    let mut frontier = 0;
    while order.len() < n {
        while frontier < order.len() {
            let current = order[frontier];
            for &edge in graph.incident_edges(current) {
                for neighbor in edge_endpoints(&examples[edge.index()]) {
                    if !touched[neighbor.index()] {
                        touched[neighbor.index()] = true;
                        order.push(neighbor);
                    }
                }
            }
            frontier += 1;
        }

        if order.len() < n {
            // finished a component; seed the next one
            if let Some(seed) = touched.iter().position(|&t| !t) {
                touched[seed] = true;
                order.push(NodeId(seed as u32));
            }
        }
    }

    order
}
