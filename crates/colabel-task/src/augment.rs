//! Reversible neighbor-feature augmentation.
//!
//! Right before a node is predicted, its feature vector is enriched with a
//! summary of its neighbors' current predicted labels: for every incident
//! edge, the edge's own features are relocated into label-conditioned
//! buckets of the reserved [`NEIGHBOR`] namespace, weighted by how many
//! neighbors currently carry each label. The enrichment is torn down again
//! immediately after the prediction, restoring the example bit-for-bit.
//!
//! Two injection rules, chosen per edge:
//! - exactly one contributing neighbor: each edge feature is relocated once
//!   into the region of that neighbor's label, value unchanged;
//! - two or more: one derived feature per label with a nonzero histogram
//!   count, value scaled by the count.
//!
//! Injected features are collected while the edge examples are borrowed
//! immutably, then attached to the node in one step, so a relocation
//! failure leaves the example untouched.

use colabel_core::error::TaskError;
use colabel_core::feature::{Example, Feature, FeatureGroup, FeatureModel, NEIGHBOR};
use colabel_core::graph::{edge_endpoints, EpisodeGraph};
use colabel_core::id::NodeId;

/// Pre-sized histogram over label indices `0..=K`, reused across nodes.
/// Cleared at the start of every edge scan; never read across calls.
///
/// Bucket `K` holds neighbors still carrying the unassigned sentinel
/// (`pred = K+1`), so unpredicted neighbors are encoded like any label.
#[derive(Debug)]
pub struct NeighborScratch {
    histogram: Vec<f32>,
}

impl NeighborScratch {
    pub fn new(k: usize) -> Self {
        NeighborScratch {
            histogram: vec![0.0; k + 1],
        }
    }

    fn clear(&mut self) {
        self.histogram.fill(0.0);
    }
}

/// Counter snapshot handed back by [`augment`]; consuming it in [`revert`]
/// is what guarantees exact restoration. One undo per augment, no overlap:
/// augmentation of the next node must not start before this one is
/// reverted.
#[derive(Debug)]
#[must_use = "augmentation must be reverted after the prediction"]
pub struct AugmentUndo {
    counters: colabel_core::feature::ExampleCounters,
}

/// Enriches `node`'s example with neighbor-prediction features.
///
/// With `use_structure` off, every edge contributes a single default
/// bucket-0 entry instead of real neighbor labels, keeping the feature
/// shape without leaking structure.
///
/// # Errors
///
/// `MisalignedFeature` if any edge feature's bucket is off-stride (an
/// upstream model mismatch). No mutation has happened at that point.
pub fn augment(
    node: NodeId,
    graph: &EpisodeGraph,
    examples: &mut [Example],
    pred: &[u32],
    model: &FeatureModel,
    use_structure: bool,
    scratch: &mut NeighborScratch,
) -> Result<AugmentUndo, TaskError> {
    let mut injected = FeatureGroup::default();

    for &edge in graph.incident_edges(node) {
        let edge_example = &examples[edge.index()];
        scratch.clear();

        let mut contributors = 0usize;
        let mut last_label = 0u64;
        if use_structure {
            for neighbor in edge_endpoints(edge_example) {
                if neighbor == node {
                    continue;
                }
                let label = (pred[neighbor.index()] - 1) as usize;
                scratch.histogram[label] += 1.0;
                contributors += 1;
                last_label = label as u64;
            }
        } else {
            scratch.histogram[0] += 1.0;
            contributors = 1;
        }

        // degenerate edge (only references this node): nothing to encode
        if contributors == 0 {
            continue;
        }

        if contributors == 1 {
            for feature in edge_example.features() {
                injected.push(Feature {
                    value: feature.value,
                    bucket: model.scheme.relocate(feature.bucket, last_label)?,
                });
            }
        } else {
            for feature in edge_example.features() {
                for (label, &count) in scratch.histogram.iter().enumerate() {
                    if count == 0.0 {
                        continue;
                    }
                    injected.push(Feature {
                        value: feature.value * count,
                        bucket: model.scheme.relocate(feature.bucket, label as u64)?,
                    });
                }
            }
        }
    }

    let node_example = &mut examples[node.index()];
    let undo = AugmentUndo {
        counters: node_example.counters(),
    };
    node_example.attach_group(NEIGHBOR, injected);
    node_example.add_interaction_terms(&model.interactions, NEIGHBOR);
    Ok(undo)
}

/// Removes the neighbor namespace and restores the counters captured at
/// augmentation time.
pub fn revert(node: NodeId, examples: &mut [Example], undo: AugmentUndo) {
    let node_example = &mut examples[node.index()];
    node_example.detach_group(NEIGHBOR);
    node_example.restore_counters(undo.counters);
}

#[cfg(test)]
mod tests {
    use super::*;
    use colabel_core::feature::{HashScheme, Namespace, LABEL_BUCKET_STRIDE};
    use colabel_core::label::{CostLabel, LabelPriors};

    const NS_N: Namespace = Namespace(b'n');
    const NS_E: Namespace = Namespace(b'e');
    const K: usize = 3;

    fn flat_model() -> FeatureModel {
        FeatureModel {
            scheme: HashScheme {
                mask: u64::MAX,
                stride_shift: 0,
                weights_per_problem: 1,
            },
            interactions: Vec::new(),
        }
    }

    /// Two labeled nodes and one hub, all joined by edges to the hub
    /// (node 3, id 2): records [n1, n2, n3, e{1,3}, e{2,3}].
    fn star_episode() -> (EpisodeGraph, Vec<Example>) {
        let mut examples = vec![
            Example::new(CostLabel::node(1)),
            Example::new(CostLabel::node(2)),
            Example::new(CostLabel::node(1)),
        ];
        for ex in &mut examples {
            ex.push(NS_N, 1.0, 10);
        }
        let mut e1 = Example::new(CostLabel::edge(&[1, 3]));
        e1.push(NS_E, 2.0, 20);
        let mut e2 = Example::new(CostLabel::edge(&[2, 3]));
        e2.push(NS_E, 4.0, 40);
        examples.push(e1);
        examples.push(e2);

        let mut priors = LabelPriors::new(K);
        let graph = EpisodeGraph::build(&examples, &mut priors).unwrap();
        (graph, examples)
    }

    #[test]
    fn single_neighbor_relocates_value_unchanged() {
        let (graph, mut examples) = star_episode();
        let pred = vec![2u32, 3, 1]; // neighbor of edge e1 w.r.t. hub is node 0, pred 2
        let model = flat_model();
        let mut scratch = NeighborScratch::new(K);

        let undo = augment(
            NodeId(2),
            &graph,
            &mut examples,
            &pred,
            &model,
            true,
            &mut scratch,
        )
        .unwrap();

        let group = examples[2].group(NEIGHBOR).unwrap();
        // one feature from each incident edge, values preserved
        let features: Vec<Feature> = group.iter().copied().collect();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].value, 2.0);
        assert_eq!(features[0].bucket, 20 + LABEL_BUCKET_STRIDE); // pred 2 -> label index 1
        assert_eq!(features[1].value, 4.0);
        assert_eq!(features[1].bucket, 40 + LABEL_BUCKET_STRIDE * 2); // pred 3 -> label index 2

        revert(NodeId(2), &mut examples, undo);
    }

    #[test]
    fn group_rule_scales_by_histogram_counts() {
        // hyperedge {1,2,3,4} seen from node 4: three contributors
        let mut examples = vec![
            Example::new(CostLabel::node(1)),
            Example::new(CostLabel::node(1)),
            Example::new(CostLabel::node(2)),
            Example::new(CostLabel::node(2)),
        ];
        let mut e = Example::new(CostLabel::edge(&[1, 2, 3, 4]));
        e.push(NS_E, 3.0, 100);
        examples.push(e);
        let mut priors = LabelPriors::new(K);
        let graph = EpisodeGraph::build(&examples, &mut priors).unwrap();

        let pred = vec![1u32, 1, 2, 4]; // labels 0,0,1 from node 4's viewpoint
        let model = flat_model();
        let mut scratch = NeighborScratch::new(K);
        let undo = augment(
            NodeId(3),
            &graph,
            &mut examples,
            &pred,
            &model,
            true,
            &mut scratch,
        )
        .unwrap();

        let group = examples[3].group(NEIGHBOR).unwrap();
        let features: Vec<Feature> = group.iter().copied().collect();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].value, 6.0); // 3.0 * count 2 at label 0
        assert_eq!(features[0].bucket, 100);
        assert_eq!(features[1].value, 3.0); // 3.0 * count 1 at label 1
        assert_eq!(features[1].bucket, 100 + LABEL_BUCKET_STRIDE);

        // sum of injected values equals value * contributing neighbors
        let total: f32 = features.iter().map(|f| f.value).sum();
        assert_eq!(total, 3.0 * 3.0);

        revert(NodeId(3), &mut examples, undo);
    }

    #[test]
    fn revert_restores_example_exactly() {
        let (graph, mut examples) = star_episode();
        let pred = vec![2u32, 3, 1];
        let model = FeatureModel {
            scheme: flat_model().scheme,
            interactions: vec![(NS_N, NEIGHBOR)],
        };
        let mut scratch = NeighborScratch::new(K);
        let before = examples[2].clone();

        let undo = augment(
            NodeId(2),
            &graph,
            &mut examples,
            &pred,
            &model,
            true,
            &mut scratch,
        )
        .unwrap();
        assert_ne!(examples[2], before);
        assert!(examples[2].num_features() > before.num_features());

        revert(NodeId(2), &mut examples, undo);
        assert_eq!(examples[2], before);
    }

    #[test]
    fn structure_disabled_uses_default_bucket() {
        let (graph, mut examples) = star_episode();
        let pred = vec![2u32, 3, 1];
        let model = flat_model();
        let mut scratch = NeighborScratch::new(K);

        let undo = augment(
            NodeId(2),
            &graph,
            &mut examples,
            &pred,
            &model,
            false,
            &mut scratch,
        )
        .unwrap();

        let group = examples[2].group(NEIGHBOR).unwrap();
        let features: Vec<Feature> = group.iter().copied().collect();
        // label index 0: buckets unchanged, values unchanged
        assert_eq!(features.len(), 2);
        assert_eq!((features[0].value, features[0].bucket), (2.0, 20));
        assert_eq!((features[1].value, features[1].bucket), (4.0, 40));

        revert(NodeId(2), &mut examples, undo);
    }

    #[test]
    fn self_only_edge_contributes_nothing() {
        let mut examples = vec![Example::new(CostLabel::node(1))];
        examples[0].push(NS_N, 1.0, 10);
        let mut e = Example::new(CostLabel::edge(&[1, 1]));
        e.push(NS_E, 5.0, 30);
        examples.push(e);
        let mut priors = LabelPriors::new(K);
        let graph = EpisodeGraph::build(&examples, &mut priors).unwrap();

        let pred = vec![4u32]; // sentinel
        let mut scratch = NeighborScratch::new(K);
        let before = examples[0].counters();
        let undo = augment(
            NodeId(0),
            &graph,
            &mut examples,
            &pred,
            &flat_model(),
            true,
            &mut scratch,
        )
        .unwrap();

        // the namespace is attached but empty, totals unchanged
        assert!(examples[0].group(NEIGHBOR).unwrap().is_empty());
        assert_eq!(examples[0].counters(), before);
        revert(NodeId(0), &mut examples, undo);
        assert!(examples[0].group(NEIGHBOR).is_none());
    }

    #[test]
    fn sentinel_predictions_land_in_top_bucket() {
        let (graph, mut examples) = star_episode();
        let pred = vec![(K + 1) as u32; 3]; // nothing predicted yet
        let model = flat_model();
        let mut scratch = NeighborScratch::new(K);

        let undo = augment(
            NodeId(2),
            &graph,
            &mut examples,
            &pred,
            &model,
            true,
            &mut scratch,
        )
        .unwrap();

        let group = examples[2].group(NEIGHBOR).unwrap();
        for (feature, base) in group.iter().zip([20u64, 40]) {
            assert_eq!(feature.bucket, base + LABEL_BUCKET_STRIDE * K as u64);
        }
        revert(NodeId(2), &mut examples, undo);
    }

    #[test]
    fn misaligned_edge_feature_fails_before_mutation() {
        let (graph, mut examples) = star_episode();
        let pred = vec![2u32, 3, 1];
        let model = FeatureModel {
            scheme: HashScheme {
                mask: u64::MAX,
                stride_shift: 3,
                weights_per_problem: 1,
            },
            interactions: Vec::new(),
        };
        let mut scratch = NeighborScratch::new(K);
        let before = examples[2].clone();

        // edge buckets 20/40 are not multiples of 8
        let result = augment(
            NodeId(2),
            &graph,
            &mut examples,
            &pred,
            &model,
            true,
            &mut scratch,
        );
        assert!(matches!(result, Err(TaskError::MisalignedFeature { .. })));
        assert_eq!(examples[2], before);
    }
}
