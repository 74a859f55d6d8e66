//! Collective classification of hypergraph nodes by iterative relabeling.
//!
//! One [`GraphTask`] labels the nodes of one episode graph at a time: a
//! breadth-first order is fixed per episode, then `num_loops` passes walk
//! it -- forwards on even passes, backwards on odd ones -- predicting every
//! node once per pass through the host's [`Predictor`]. Each prediction
//! sees its neighbors' current labels twice over: as conditioning
//! references, and (when the predictor wants full examples) as reversibly
//! injected features summarizing the neighbor label distribution. After
//! the final pass a macro-F1 over the labeled nodes becomes the reported
//! loss.
//!
//! Everything is strictly sequential: predictions made earlier in a pass
//! are visible to later nodes in the same pass, and to the next pass.
//!
//! Lifecycle: [`GraphTask::new`] once per task, [`GraphTask::setup_episode`]
//! per episode, [`GraphTask::run`] per run over that episode; dropping the
//! [`Episode`] releases its traversal/prediction/adjacency state. Only the
//! label priors survive across episodes.

pub mod augment;
pub mod config;
pub mod metrics;
pub mod predict;
pub mod traversal;

use std::io::Write;

use tracing::debug;

use colabel_core::error::TaskError;
use colabel_core::feature::{Example, FeatureModel};
use colabel_core::graph::{edge_endpoints, EpisodeGraph};
use colabel_core::id::NodeId;
use colabel_core::label::LabelPriors;

use crate::augment::NeighborScratch;

// Re-export commonly used types
pub use crate::config::TaskConfig;
pub use crate::metrics::ConfusionMatrix;
pub use crate::predict::{Condition, PredictRequest, Predictor, CONDITION_NAME};

/// One episode's state: the records, the derived graph, the fixed
/// traversal order, and the mutable prediction array.
#[derive(Debug)]
pub struct Episode {
    examples: Vec<Example>,
    graph: EpisodeGraph,
    order: Vec<NodeId>,
    pred: Vec<u32>,
}

impl Episode {
    pub fn graph(&self) -> &EpisodeGraph {
        &self.graph
    }

    /// The traversal order, a permutation of all node ids.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Current predictions, indexed by node id. Entries hold the
    /// unassigned sentinel `K+1` until the node's first prediction.
    pub fn predictions(&self) -> &[u32] {
        &self.pred
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }
}

/// Result of one run over an episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// `1 - macro_f1`, or `0.0` for an episode with no labeled nodes.
    pub loss: f32,
    /// The macro-F1 itself, when at least one label occurred.
    pub macro_f1: Option<f32>,
}

/// The task instance. Owns the process-lifetime state: configuration,
/// label priors, the confusion matrix, and the histogram scratch buffer.
#[derive(Debug)]
pub struct GraphTask {
    config: TaskConfig,
    k: usize,
    priors: LabelPriors,
    confusion: ConfusionMatrix,
    scratch: NeighborScratch,
}

impl GraphTask {
    /// One-time setup for `num_labels` classes (`K`, not counting the
    /// unassigned sentinel). The configuration is normalized here.
    pub fn new(num_labels: usize, config: TaskConfig) -> Self {
        let config = config.normalized();
        GraphTask {
            k: num_labels,
            priors: LabelPriors::new(num_labels),
            confusion: ConfusionMatrix::new(num_labels),
            scratch: NeighborScratch::new(num_labels),
            config,
        }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn num_labels(&self) -> usize {
        self.k
    }

    /// Accumulated label priors (persist across episodes).
    pub fn priors(&self) -> &LabelPriors {
        &self.priors
    }

    /// How many underlying learners the host should allocate.
    pub fn num_learners(&self) -> usize {
        if self.config.separate_learners {
            self.config.num_loops
        } else {
            1
        }
    }

    fn sentinel(&self) -> u32 {
        self.k as u32 + 1
    }

    /// Builds the per-episode state: validates and classifies the records,
    /// derives adjacency (feeding labeled nodes into the priors), computes
    /// the traversal order, and initializes predictions to the sentinel.
    pub fn setup_episode(&mut self, examples: Vec<Example>) -> Result<Episode, TaskError> {
        let graph = EpisodeGraph::build(&examples, &mut self.priors)?;
        let order = traversal::breadth_first_order(&graph, &examples);
        let pred = vec![self.sentinel(); graph.node_count()];
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "episode ready"
        );
        Ok(Episode {
            examples,
            graph,
            order,
            pred,
        })
    }

    /// Runs all passes over the episode and scores the result.
    ///
    /// When `output` is given, the final predictions are emitted to it in
    /// node-id order as space-separated labels.
    ///
    /// # Errors
    ///
    /// Augmentation's `MisalignedFeature` (before the offending node is
    /// predicted), or an I/O error from the output stream.
    pub fn run<P: Predictor>(
        &mut self,
        episode: &mut Episode,
        model: &FeatureModel,
        predictor: &mut P,
        output: Option<&mut dyn Write>,
    ) -> Result<RunSummary, TaskError> {
        self.confusion.reset();
        let sentinel = self.sentinel();
        episode.pred.fill(sentinel);

        let node_count = episode.order.len();
        let mut conditions: Vec<Condition> = Vec::new();

        for pass in 0..self.config.num_loops {
            for step in 0..node_count {
                // forwards on even passes, backwards on odd ones
                let slot = if pass % 2 == 0 {
                    step
                } else {
                    node_count - 1 - step
                };
                let node = episode.order[slot];

                let undo = if predictor.needs_example() {
                    Some(augment::augment(
                        node,
                        &episode.graph,
                        &mut episode.examples,
                        &episode.pred,
                        model,
                        self.config.use_structure,
                        &mut self.scratch,
                    )?)
                } else {
                    None
                };

                conditions.clear();
                for &edge in episode.graph.incident_edges(node) {
                    for neighbor in edge_endpoints(&episode.examples[edge.index()]) {
                        if neighbor == node {
                            continue;
                        }
                        conditions.push(Condition {
                            tag: neighbor.0 + 1,
                            name: CONDITION_NAME,
                        });
                    }
                }

                let node_example = &episode.examples[node.index()];
                let label = predictor.predict(PredictRequest {
                    tag: node.0 + 1,
                    example: node_example,
                    oracle: node_example.label().true_label(),
                    learner: if self.config.separate_learners { pass } else { 0 },
                    conditions: &conditions,
                });
                episode.pred[node.index()] = label;

                if let Some(undo) = undo {
                    augment::revert(node, &mut episode.examples, undo);
                }
            }
        }

        for node in episode.graph.node_ids() {
            if let Some(truth) = episode.examples[node.index()].label().true_label() {
                self.confusion.record(truth, episode.pred[node.index()]);
            }
        }
        let macro_f1 = self.confusion.macro_f1();
        let loss = macro_f1.map_or(0.0, |f1| 1.0 - f1);
        debug!(loss, passes = self.config.num_loops, "run complete");

        if let Some(out) = output {
            for &label in &episode.pred {
                write!(out, "{label} ")?;
            }
        }

        Ok(RunSummary { loss, macro_f1 })
    }
}
