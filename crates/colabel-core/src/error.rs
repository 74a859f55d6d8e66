//! Core error types for colabel-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Every variant
//! except `Io` is a fatal structural-validation failure: it indicates
//! malformed episode input or an inconsistent model configuration, never a
//! transient condition, so callers abort the current run rather than retry.

use crate::id::EdgeId;
use thiserror::Error;

/// Errors produced while building or labeling an episode.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A node record appeared after the first edge record. Episodes must
    /// list all nodes before any edge.
    #[error("node record at index {index} appears after an edge record")]
    NodeAfterEdge { index: usize },

    /// An episode contained edges but no nodes at all. Usually means the
    /// input window was too small to hold a complete episode.
    #[error("episode has {edge_count} edges but no nodes (input window too small?)")]
    EdgesWithoutNodes { edge_count: usize },

    /// An edge referenced a node id outside `1..=node_count`.
    #[error("edge {edge} references node id {class} but the episode has {node_count} nodes")]
    EdgeEndpointOutOfRange {
        edge: EdgeId,
        class: u32,
        node_count: usize,
    },

    /// A feature bucket was not a multiple of the model's per-feature
    /// stride. Indicates an upstream configuration mismatch, not bad data.
    #[error("feature bucket {bucket} is not aligned to the model stride {multiplier}")]
    MisalignedFeature { bucket: u64, multiplier: u64 },

    /// Failure while emitting predictions to the output stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
