pub mod error;
pub mod feature;
pub mod graph;
pub mod id;
pub mod label;

// Re-export commonly used types
pub use error::TaskError;
pub use feature::{Example, Feature, FeatureGroup, FeatureModel, HashScheme, Namespace, NEIGHBOR};
pub use graph::{edge_endpoints, EpisodeGraph};
pub use id::{EdgeId, NodeId};
pub use label::{CostLabel, CostPair, LabelPriors};
