//! Explicit holder for the session's model.

use crate::ForestError;
use crate::features::PatientFeatures;
use crate::model::Model;
use crate::risk::PredictionResult;

/// The loaded model, or the fact that loading did not succeed.
///
/// A store is either fully ready or not ready at all; there is no partially
/// populated state. Pass it by reference to every caller that predicts.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModelStore {
    /// No model is available.
    #[default]
    NotReady,
    /// A validated model is available.
    Ready(Model),
}

impl ModelStore {
    /// Create a store holding `model`.
    #[must_use]
    pub fn ready(model: Model) -> Self {
        ModelStore::Ready(model)
    }

    /// Return `true` if a model is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStore::Ready(_))
    }

    /// Borrow the model.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ModelNotLoaded`] when the store is not ready.
    pub fn model(&self) -> Result<&Model, ForestError> {
        match self {
            ModelStore::Ready(model) => Ok(model),
            ModelStore::NotReady => Err(ForestError::ModelNotLoaded),
        }
    }

    /// Score one patient against the stored model.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ModelNotLoaded`] when the store is not ready,
    /// otherwise whatever [`Model::predict`] returns.
    pub fn predict(&self, patient: &PatientFeatures) -> Result<PredictionResult, ForestError> {
        self.model()?.predict(patient)
    }
}

impl From<Model> for ModelStore {
    fn from(model: Model) -> Self {
        ModelStore::Ready(model)
    }
}
