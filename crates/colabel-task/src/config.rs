//! Task configuration.

use serde::{Deserialize, Serialize};

/// Options for one task instance, fixed for its lifetime.
///
/// The host registers three switches and hands the result here: the number
/// of inference passes, whether neighbor (structural) features are used,
/// and whether each pass gets its own underlying learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// How many passes to run over the node order. Default 2, floor 1.
    pub num_loops: usize,
    /// Whether neighbor predictions are folded into node features.
    pub use_structure: bool,
    /// Whether pass `i` routes to learner `i` instead of a shared learner.
    pub separate_learners: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        TaskConfig {
            num_loops: 2,
            use_structure: true,
            separate_learners: false,
        }
    }
}

impl TaskConfig {
    /// Clamps the configuration to its effective form: at least one pass,
    /// and separate learners only make sense with more than one pass.
    pub fn normalized(mut self) -> Self {
        if self.num_loops <= 1 {
            self.num_loops = 1;
            self.separate_learners = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TaskConfig::default();
        assert_eq!(config.num_loops, 2);
        assert!(config.use_structure);
        assert!(!config.separate_learners);
    }

    #[test]
    fn normalization_floors_passes_and_drops_separate_learners() {
        let config = TaskConfig {
            num_loops: 0,
            use_structure: true,
            separate_learners: true,
        }
        .normalized();
        assert_eq!(config.num_loops, 1);
        assert!(!config.separate_learners);

        let config = TaskConfig {
            num_loops: 3,
            use_structure: true,
            separate_learners: true,
        }
        .normalized();
        assert_eq!(config.num_loops, 3);
        assert!(config.separate_learners);
    }

    #[test]
    fn serde_partial_config_uses_defaults() {
        let config: TaskConfig = serde_json::from_str(r#"{"num_loops": 4}"#).unwrap();
        assert_eq!(config.num_loops, 4);
        assert!(config.use_structure);
    }
}
