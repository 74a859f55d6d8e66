//! Cost-sensitive record labels and persistent label priors.
//!
//! Every episode record carries a [`CostLabel`]: a list of
//! `(class_index, weight)` pairs. Arity is what distinguishes record kinds --
//! a record with more than one pair is a hyperedge (the classes are 1-based
//! node ids), a record with zero or one pair is a node (the class, if
//! present and nonzero, is its ground-truth label in `1..=K`).

use serde::{Deserialize, Serialize};

/// One `(class_index, weight)` entry of a cost-sensitive label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostPair {
    pub class: u32,
    pub weight: f32,
}

/// The label attached to an episode record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostLabel {
    pub costs: Vec<CostPair>,
}

impl CostLabel {
    /// A labeled node record with unit weight.
    pub fn node(class: u32) -> Self {
        CostLabel {
            costs: vec![CostPair { class, weight: 1.0 }],
        }
    }

    /// An unlabeled (test) node record.
    pub fn unlabeled() -> Self {
        CostLabel { costs: Vec::new() }
    }

    /// A hyperedge record touching the given 1-based node ids.
    pub fn edge(endpoints: &[u32]) -> Self {
        CostLabel {
            costs: endpoints
                .iter()
                .map(|&class| CostPair { class, weight: 1.0 })
                .collect(),
        }
    }

    /// A record is an edge iff it references more than one node id.
    pub fn is_edge(&self) -> bool {
        self.costs.len() > 1
    }

    /// A record is a test record iff it carries no cost pairs.
    pub fn is_test(&self) -> bool {
        self.costs.is_empty()
    }

    /// The node's ground-truth label, if it has one. `None` for unlabeled
    /// nodes (no pairs, or a zero class).
    pub fn true_label(&self) -> Option<u32> {
        self.costs.first().map(|c| c.class).filter(|&c| c > 0)
    }
}

/// Running per-task label counts with Laplace smoothing.
///
/// Unlike the rest of the episode state, the priors accumulate for the
/// task's entire lifetime: every labeled node observed during graph
/// construction bumps its label's count, across all episodes. They feed
/// [`example_weight`](Self::example_weight), which implements the original
/// task's cost-sensitive reweighting formula; that weight is informational
/// for now and is not applied to prediction requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPriors {
    counts: Vec<f32>,
    total: f32,
}

impl LabelPriors {
    /// Priors over labels `1..=k`, every count starting at 1.0.
    pub fn new(k: usize) -> Self {
        LabelPriors {
            counts: vec![1.0; k + 1],
            total: (k + 1) as f32,
        }
    }

    /// Records one occurrence of a true label.
    pub fn observe(&mut self, label: u32) {
        self.counts[label as usize] += 1.0;
        self.total += 1.0;
    }

    /// Smoothed count for one label.
    pub fn count(&self, label: u32) -> f32 {
        self.counts[label as usize]
    }

    /// Sum of all counts.
    pub fn total(&self) -> f32 {
        self.total
    }

    /// Inverse-frequency weight for an example with the given true label:
    /// `total / count(label) / K`. Rare labels weigh more than frequent
    /// ones. Not currently wired into the prediction call.
    pub fn example_weight(&self, label: u32) -> f32 {
        let k = (self.counts.len() - 1) as f32;
        self.total / self.counts[label as usize] / k
    }
}
