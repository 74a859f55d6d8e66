//! Sparse hashed feature vectors for episode records.
//!
//! An [`Example`] groups features into namespaces, mirroring the host
//! model's representation: each namespace owns a list of
//! `(value, bucket)` features plus its running sum of squared values, and
//! the example tracks totals across namespaces. Buckets are pre-strided --
//! every bucket is a multiple of the model's per-feature stride
//! (see [`HashScheme`]) -- which is what makes label-conditioned relocation
//! of a feature into a derived region possible.
//!
//! The augmentation path attaches and detaches whole feature groups; the
//! [`counters`](Example::counters) / [`restore_counters`](Example::restore_counters)
//! snapshot pair exists so that detaching restores the example bit-for-bit
//! even where float accumulation would not round-trip.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::label::CostLabel;

/// A single-byte feature namespace tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(pub u8);

/// Reserved namespace receiving injected neighbor-prediction features.
pub const NEIGHBOR: Namespace = Namespace(126);

/// Multiplicative offset spreading derived features across label-specific
/// bucket regions. Chosen large and odd so regions for different labels
/// rarely collide under the weight mask.
pub const LABEL_BUCKET_STRIDE: u64 = 348_919_043;

/// One hashed feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub value: f32,
    pub bucket: u64,
}

/// The features of one namespace, with their running sum of squares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroup {
    features: Vec<Feature>,
    sum_feat_sq: f32,
}

impl FeatureGroup {
    pub fn push(&mut self, feature: Feature) {
        self.sum_feat_sq += feature.value * feature.value;
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn sum_feat_sq(&self) -> f32 {
        self.sum_feat_sq
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

/// The host model's feature-hashing parameters.
///
/// Every live feature bucket is a multiple of
/// `multiplier = weights_per_problem << stride_shift`; dividing by the
/// multiplier recovers the logical bucket, and relocated buckets are
/// re-strided and masked back into the weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashScheme {
    pub mask: u64,
    pub stride_shift: u32,
    pub weights_per_problem: u64,
}

impl Default for HashScheme {
    fn default() -> Self {
        // 18-bit weight table, single problem, no stride.
        HashScheme {
            mask: (1 << 18) - 1,
            stride_shift: 0,
            weights_per_problem: 1,
        }
    }
}

impl HashScheme {
    /// Combined per-feature stride.
    pub fn multiplier(&self) -> u64 {
        self.weights_per_problem << self.stride_shift
    }

    /// Relocates a feature bucket into the derived region for a 0-based
    /// label `k`: strip the stride, offset by `k * LABEL_BUCKET_STRIDE`,
    /// re-stride, and mask.
    ///
    /// # Errors
    ///
    /// `MisalignedFeature` if the bucket is not a multiple of the stride;
    /// a misaligned bucket means the example was built against a different
    /// model configuration.
    pub fn relocate(&self, bucket: u64, label: u64) -> Result<u64, TaskError> {
        let multiplier = self.multiplier();
        if bucket % multiplier != 0 {
            return Err(TaskError::MisalignedFeature { bucket, multiplier });
        }
        let base = bucket / multiplier;
        Ok(base
            .wrapping_add(LABEL_BUCKET_STRIDE.wrapping_mul(label))
            .wrapping_mul(multiplier)
            & self.mask)
    }
}

/// Hashing parameters plus the model's configured namespace interactions
/// (pairs whose feature counts and sums of squares multiply).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureModel {
    pub scheme: HashScheme,
    pub interactions: Vec<(Namespace, Namespace)>,
}

/// Snapshot of an example's running totals, taken before augmentation and
/// restored on revert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExampleCounters {
    pub num_features: usize,
    pub total_sum_feat_sq: f32,
}

/// One episode record: a label plus namespaced features.
///
/// Namespace order is insertion order (the active-namespace list), so a
/// group attached last can be detached without disturbing the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    label: CostLabel,
    groups: IndexMap<Namespace, FeatureGroup>,
    num_features: usize,
    total_sum_feat_sq: f32,
}

impl Example {
    pub fn new(label: CostLabel) -> Self {
        Example {
            label,
            groups: IndexMap::new(),
            num_features: 0,
            total_sum_feat_sq: 0.0,
        }
    }

    pub fn label(&self) -> &CostLabel {
        &self.label
    }

    pub fn is_edge(&self) -> bool {
        self.label.is_edge()
    }

    pub fn is_test(&self) -> bool {
        self.label.is_test()
    }

    /// Adds one feature through the normal construction path, keeping the
    /// group and the example totals in sync.
    pub fn push(&mut self, ns: Namespace, value: f32, bucket: u64) {
        let group = self.groups.entry(ns).or_default();
        group.push(Feature { value, bucket });
        self.num_features += 1;
        self.total_sum_feat_sq += value * value;
    }

    pub fn group(&self, ns: Namespace) -> Option<&FeatureGroup> {
        self.groups.get(&ns)
    }

    /// Active namespaces in insertion order.
    pub fn namespaces(&self) -> impl Iterator<Item = Namespace> + '_ {
        self.groups.keys().copied()
    }

    /// Every feature of every active namespace, in namespace order.
    pub fn features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.groups.values().flat_map(|g| g.iter().copied())
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn total_sum_feat_sq(&self) -> f32 {
        self.total_sum_feat_sq
    }

    /// Snapshot of the running totals.
    pub fn counters(&self) -> ExampleCounters {
        ExampleCounters {
            num_features: self.num_features,
            total_sum_feat_sq: self.total_sum_feat_sq,
        }
    }

    /// Restores totals captured by [`counters`](Self::counters). Pairs with
    /// [`detach_group`](Self::detach_group) to undo an
    /// [`attach_group`](Self::attach_group) exactly.
    pub fn restore_counters(&mut self, counters: ExampleCounters) {
        self.num_features = counters.num_features;
        self.total_sum_feat_sq = counters.total_sum_feat_sq;
    }

    /// Appends a whole feature group as the most recent namespace, folding
    /// its count and sum of squares into the totals. The namespace must not
    /// already be active.
    pub fn attach_group(&mut self, ns: Namespace, group: FeatureGroup) {
        debug_assert!(!self.groups.contains_key(&ns));
        self.num_features += group.len();
        self.total_sum_feat_sq += group.sum_feat_sq();
        self.groups.insert(ns, group);
    }

    /// Removes a namespace and subtracts its count and sum of squares from
    /// the totals. Returns the removed group, if the namespace was active.
    pub fn detach_group(&mut self, ns: Namespace) -> Option<FeatureGroup> {
        let group = self.groups.shift_remove(&ns)?;
        self.num_features -= group.len();
        self.total_sum_feat_sq -= group.sum_feat_sq();
        Some(group)
    }

    /// Folds cross-namespace interaction terms into the totals: for every
    /// configured pair that includes `ns`, the feature counts multiply and
    /// the sums of squares multiply. There is no subtractive counterpart;
    /// callers undo via a [`counters`](Self::counters) snapshot.
    pub fn add_interaction_terms(&mut self, pairs: &[(Namespace, Namespace)], ns: Namespace) {
        let mut features = 0usize;
        let mut sum_sq = 0.0f32;
        for &(a, b) in pairs {
            if a != ns && b != ns {
                continue;
            }
            let (len_a, sq_a) = self
                .group(a)
                .map_or((0, 0.0), |g| (g.len(), g.sum_feat_sq()));
            let (len_b, sq_b) = self
                .group(b)
                .map_or((0, 0.0), |g| (g.len(), g.sum_feat_sq()));
            features += len_a * len_b;
            sum_sq += sq_a * sq_b;
        }
        self.num_features += features;
        self.total_sum_feat_sq += sum_sq;
    }
}
