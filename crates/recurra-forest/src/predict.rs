//! Ensemble evaluation: per-tree traversal, averaging, and tiering.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::debug;

use crate::ForestError;
use crate::features::{FeatureVector, PatientFeatures, build_feature_vector};
use crate::model::Model;
use crate::risk::{PredictionResult, classify, normalize};
use crate::tree::SurvivalTree;

/// Return the leaf sample count `vector` reaches in `tree`.
///
/// # Errors
///
/// Returns [`ForestError::MalformedTree`] if the tree cannot be walked to a leaf.
pub fn evaluate_tree(tree: &SurvivalTree, vector: &FeatureVector) -> Result<usize, ForestError> {
    tree.evaluate(vector.as_slice())
}

/// Return the mean leaf sample count across `trees`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::EmptyEnsemble`] | `trees` is empty |
/// | [`ForestError::MalformedTree`] | any tree cannot be walked to a leaf |
pub fn aggregate(trees: &[SurvivalTree], vector: &FeatureVector) -> Result<f64, ForestError> {
    if trees.is_empty() {
        return Err(ForestError::EmptyEnsemble);
    }
    let mut total = 0.0f64;
    for tree in trees {
        total += evaluate_tree(tree, vector)? as f64;
    }
    Ok(total / trees.len() as f64)
}

/// Score one patient: build the vector, average the trees, normalize, classify.
///
/// # Errors
///
/// Returns the first failure among [`ForestError::InvalidFeatureValue`],
/// [`ForestError::EmptyEnsemble`] and [`ForestError::MalformedTree`].
pub fn predict(model: &Model, patient: &PatientFeatures) -> Result<PredictionResult, ForestError> {
    model.predict(patient)
}

impl Model {
    /// Score one patient.
    ///
    /// # Errors
    ///
    /// See [`predict`].
    pub fn predict(&self, patient: &PatientFeatures) -> Result<PredictionResult, ForestError> {
        let vector = build_feature_vector(self, patient)?;
        self.predict_vector(&vector)
    }

    /// Score a vector already in model feature order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyEnsemble`] | the model holds no trees |
    /// | [`ForestError::MalformedTree`] | any tree cannot be walked to a leaf |
    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<PredictionResult, ForestError> {
        let raw_score = aggregate(&self.trees, vector)?;
        let risk_score = normalize(raw_score);
        let risk_group = classify(risk_score, &self.percentiles);
        debug!(raw_score, risk_score, %risk_group, "prediction complete");
        Ok(PredictionResult {
            risk_score,
            risk_group,
        })
    }

    /// Score many patients in parallel.
    ///
    /// Results are returned in input order; each patient succeeds or fails
    /// independently.
    #[must_use]
    pub fn predict_batch(
        &self,
        patients: &[PatientFeatures],
    ) -> Vec<Result<PredictionResult, ForestError>> {
        patients
            .par_iter()
            .map(|patient| self.predict(patient))
            .collect()
    }

    /// Return each tree's leaf sample count for `vector`, in ensemble order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MalformedTree`] if any tree cannot be walked to a leaf.
    pub fn tree_outputs(&self, vector: &FeatureVector) -> Result<Vec<usize>, ForestError> {
        self.trees
            .iter()
            .map(|tree| evaluate_tree(tree, vector))
            .collect()
    }
}
