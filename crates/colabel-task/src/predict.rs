//! The prediction seam between the task and the host learner.
//!
//! The task never sees weights or gradients; it scopes a request to one
//! node's (possibly augmented) example, names the oracle label and the
//! conditioning neighbors, and lets the host produce a label. During
//! oracle-guided training the host imitates the oracle; at prediction time
//! it conditions on whatever neighbor predictions currently exist,
//! including ones made earlier in the same pass.

use colabel_core::feature::Example;

/// Conditioning tag attached to every neighbor reference.
pub const CONDITION_NAME: u8 = b'e';

/// A reference to another entity's current prediction, supplied as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    /// 1-based tag of the referenced node.
    pub tag: u32,
    /// Single-byte condition name.
    pub name: u8,
}

/// One prediction request, scoped to a single node within a pass.
#[derive(Debug)]
pub struct PredictRequest<'a> {
    /// 1-based tag of the node being predicted.
    pub tag: u32,
    /// The node's example, augmented when the predictor asked for it.
    pub example: &'a Example,
    /// Ground-truth label, when the node has one. Training only; ignored
    /// at pure test time.
    pub oracle: Option<u32>,
    /// Which underlying learner to use (always 0 unless the task routes
    /// each pass to its own learner).
    pub learner: usize,
    /// Already-known neighbor labels to condition on.
    pub conditions: &'a [Condition],
}

/// Host-provided predictor.
pub trait Predictor {
    /// Whether prediction conditions on the full example representation
    /// (triggering feature augmentation) as opposed to only the
    /// conditioning labels.
    fn needs_example(&self) -> bool;

    /// Produces a label in `1..=K` for the request.
    fn predict(&mut self, request: PredictRequest<'_>) -> u32;
}
