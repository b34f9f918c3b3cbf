/// Errors from model validation and risk evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForestError {
    /// Returned when prediction is attempted against a store with no model.
    #[error("model is not loaded")]
    ModelNotLoaded,

    /// Returned when a patient feature is absent, empty, non-numeric, or non-finite.
    #[error("invalid or missing value for feature \"{name}\"")]
    InvalidFeatureValue {
        /// Name of the offending feature.
        name: String,
    },

    /// Returned when an ensemble with zero trees is evaluated.
    #[error("ensemble contains no trees")]
    EmptyEnsemble,

    /// Returned when a tree violates its structural invariants.
    #[error("malformed tree {tree} at node {node}: {reason}")]
    MalformedTree {
        /// Zero-based position of the tree in the ensemble.
        tree: usize,
        /// Node id where the violation was detected.
        node: usize,
        /// Human-readable description of the violation.
        reason: String,
    },

    /// Returned when a model declares no feature names.
    #[error("model declares no feature names")]
    EmptyFeatureNames,

    /// Returned when a feature name appears more than once.
    #[error("duplicate feature name \"{name}\"")]
    DuplicateFeatureName {
        /// The repeated feature name.
        name: String,
    },

    /// Returned when the percentile cut points are non-finite or out of order.
    #[error("risk percentiles must be finite with p25 <= p75, got p25={p25}, p75={p75}")]
    InvalidPercentiles {
        /// The lower cut point.
        p25: f64,
        /// The upper cut point.
        p75: f64,
    },

    /// Returned when `n_estimators` disagrees with the number of trees supplied.
    #[error("model declares {declared} estimators but contains {actual} trees")]
    TreeCountMismatch {
        /// Value of the `n_estimators` field.
        declared: usize,
        /// Number of trees actually present.
        actual: usize,
    },

    /// Returned when a pre-ordered feature row has the wrong length.
    #[error("feature row has {got} values, expected {expected}")]
    FeatureCountMismatch {
        /// Number of features the model expects.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },
}

impl ForestError {
    pub(crate) fn malformed(tree: usize, node: usize, reason: impl Into<String>) -> Self {
        Self::MalformedTree {
            tree,
            node,
            reason: reason.into(),
        }
    }
}
