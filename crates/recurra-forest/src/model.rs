//! The immutable model: feature order, validated trees, and percentile cut points.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::ForestError;
use crate::tree::{SurvivalTree, TreeArrays};

/// Risk-score cut points computed offline over the training cohort.
///
/// Expressed in the same units as the normalized score.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RiskPercentiles {
    /// 25th percentile: scores below it are low risk.
    pub p25: f64,
    /// Median, exported for display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p50: Option<f64>,
    /// 75th percentile: scores at or above it are high risk.
    pub p75: f64,
}

impl RiskPercentiles {
    /// Create cut points from the lower and upper percentiles.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidPercentiles`] if either value is
    /// non-finite or `p25 > p75`.
    pub fn new(p25: f64, p75: f64) -> Result<Self, ForestError> {
        let percentiles = Self { p25, p50: None, p75 };
        percentiles.validate()?;
        Ok(percentiles)
    }

    fn validate(&self) -> Result<(), ForestError> {
        if !self.p25.is_finite() || !self.p75.is_finite() || self.p25 > self.p75 {
            return Err(ForestError::InvalidPercentiles {
                p25: self.p25,
                p75: self.p75,
            });
        }
        Ok(())
    }
}

/// The model document exactly as the training script writes it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelDocument {
    /// Ordered feature names; defines the input vector order.
    pub feature_names: Vec<String>,
    /// Declared number of trees, if exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<usize>,
    /// Trees as parallel node arrays.
    pub trees: Vec<TreeArrays>,
    /// Tier cut points.
    pub risk_percentiles: RiskPercentiles,
    /// Training-set concordance index, if exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_index: Option<f64>,
}

/// A validated random survival forest.
///
/// Only obtainable through [`Model::from_document`] or [`Model::new`], so
/// every `Model` satisfies the structural invariants the evaluator relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) feature_names: Vec<String>,
    pub(crate) trees: Vec<SurvivalTree>,
    pub(crate) percentiles: RiskPercentiles,
    pub(crate) c_index: Option<f64>,
}

/// Structural overview of a loaded model.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ModelSummary {
    /// Ordered feature names.
    pub feature_names: Vec<String>,
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Total nodes across all trees.
    pub n_nodes: usize,
    /// Total leaves across all trees.
    pub n_leaves: usize,
    /// Deepest leaf across all trees.
    pub max_depth: usize,
    /// Tier cut points.
    pub risk_percentiles: RiskPercentiles,
    /// Training-set concordance index, if known.
    pub c_index: Option<f64>,
}

impl Model {
    /// Build a model from its parts.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyFeatureNames`] | `feature_names` is empty |
    /// | [`ForestError::DuplicateFeatureName`] | a name appears twice |
    /// | [`ForestError::EmptyEnsemble`] | `trees` is empty |
    /// | [`ForestError::MalformedTree`] | a tree violates its structural invariants |
    /// | [`ForestError::InvalidPercentiles`] | cut points are non-finite or out of order |
    pub fn new(
        feature_names: Vec<String>,
        trees: &[TreeArrays],
        percentiles: RiskPercentiles,
    ) -> Result<Self, ForestError> {
        if feature_names.is_empty() {
            return Err(ForestError::EmptyFeatureNames);
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(ForestError::DuplicateFeatureName { name: name.clone() });
            }
        }

        if trees.is_empty() {
            return Err(ForestError::EmptyEnsemble);
        }
        let trees = trees
            .iter()
            .enumerate()
            .map(|(position, arrays)| {
                SurvivalTree::from_arrays(arrays, feature_names.len(), position)
            })
            .collect::<Result<Vec<_>, _>>()?;

        percentiles.validate()?;

        Ok(Self {
            feature_names,
            trees,
            percentiles,
            c_index: None,
        })
    }

    /// Validate an exported model document.
    ///
    /// # Errors
    ///
    /// Everything [`Model::new`] returns, plus
    /// [`ForestError::TreeCountMismatch`] when `n_estimators` is present and
    /// disagrees with the number of trees.
    #[instrument(skip_all, fields(n_trees = document.trees.len()))]
    pub fn from_document(document: ModelDocument) -> Result<Self, ForestError> {
        if let Some(declared) = document.n_estimators
            && declared != document.trees.len()
        {
            return Err(ForestError::TreeCountMismatch {
                declared,
                actual: document.trees.len(),
            });
        }

        let mut model = Self::new(
            document.feature_names,
            &document.trees,
            document.risk_percentiles,
        )?;
        model.c_index = document.c_index;

        debug!(
            n_features = model.feature_names.len(),
            n_trees = model.trees.len(),
            "model validated"
        );
        Ok(model)
    }

    /// Return the ordered feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the number of features each input must supply.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the trees in ensemble order.
    #[must_use]
    pub fn trees(&self) -> &[SurvivalTree] {
        &self.trees
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the tier cut points.
    #[must_use]
    pub fn percentiles(&self) -> &RiskPercentiles {
        &self.percentiles
    }

    /// Return the training-set concordance index, if the export carried one.
    #[must_use]
    pub fn c_index(&self) -> Option<f64> {
        self.c_index
    }

    /// Summarize the model's structure.
    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            feature_names: self.feature_names.clone(),
            n_trees: self.trees.len(),
            n_nodes: self.trees.iter().map(SurvivalTree::n_nodes).sum(),
            n_leaves: self.trees.iter().map(SurvivalTree::n_leaves).sum(),
            max_depth: self.trees.iter().map(SurvivalTree::depth).max().unwrap_or(0),
            risk_percentiles: self.percentiles,
            c_index: self.c_index,
        }
    }
}
