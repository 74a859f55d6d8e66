//! Episode hypergraph: record classification, validation, adjacency.
//!
//! An episode arrives as a flat list of records, all nodes first, then all
//! hyperedges. [`EpisodeGraph::build`] classifies each record by label
//! arity, validates the structural invariants, and derives per-node
//! adjacency: for each node, the list of incident edge ids in edge order.
//!
//! There is no node-to-node linkage; edges live in the episode's example
//! list (their `EdgeId` is their position there) and each node keeps an
//! index list into that arena. Hyperedge neighbors are recovered by walking
//! an incident edge's endpoints.

use smallvec::SmallVec;

use crate::error::TaskError;
use crate::feature::Example;
use crate::id::{EdgeId, NodeId};
use crate::label::LabelPriors;

/// Incident-edge list for one node. Most nodes touch only a few edges.
pub type AdjacencyList = SmallVec<[EdgeId; 4]>;

/// The structure of one episode, built once per episode and read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct EpisodeGraph {
    node_count: usize,
    edge_count: usize,
    adjacency: Vec<AdjacencyList>,
}

impl EpisodeGraph {
    /// Builds the graph from an episode's records, accumulating every
    /// labeled node into the persistent label priors as a side effect.
    ///
    /// # Errors
    ///
    /// - `NodeAfterEdge` if a node record follows an edge record.
    /// - `EdgesWithoutNodes` if edges are present but no nodes are.
    /// - `EdgeEndpointOutOfRange` if an edge references a node id of 0 or
    ///   greater than the node count.
    pub fn build(examples: &[Example], priors: &mut LabelPriors) -> Result<Self, TaskError> {
        let mut node_count = 0usize;
        let mut edge_count = 0usize;
        for (index, example) in examples.iter().enumerate() {
            if example.is_edge() {
                edge_count += 1;
            } else {
                if edge_count > 0 {
                    return Err(TaskError::NodeAfterEdge { index });
                }
                node_count += 1;
                if let Some(label) = example.label().true_label() {
                    priors.observe(label);
                }
            }
        }

        if node_count == 0 && edge_count > 0 {
            return Err(TaskError::EdgesWithoutNodes { edge_count });
        }

        let mut adjacency = vec![AdjacencyList::new(); node_count];
        for (index, example) in examples.iter().enumerate().skip(node_count) {
            let edge = EdgeId(index as u32);
            for pair in &example.label().costs {
                if pair.class == 0 || pair.class as usize > node_count {
                    return Err(TaskError::EdgeEndpointOutOfRange {
                        edge,
                        class: pair.class,
                        node_count,
                    });
                }
            }
            for pair in &example.label().costs {
                let list = &mut adjacency[(pair.class - 1) as usize];
                // suppress consecutive duplicates only
                if list.last() != Some(&edge) {
                    list.push(edge);
                }
            }
        }

        Ok(EpisodeGraph {
            node_count,
            edge_count,
            adjacency,
        })
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Ids of the edges incident to a node, in edge order.
    pub fn incident_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.adjacency[node.index()]
    }

    /// All node ids, `0..node_count`.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count as u32).map(NodeId)
    }
}

/// The node endpoints of an edge record (1-based classes mapped to ids).
pub fn edge_endpoints(edge: &Example) -> impl Iterator<Item = NodeId> + '_ {
    edge.label().costs.iter().map(|c| NodeId(c.class - 1))
}
