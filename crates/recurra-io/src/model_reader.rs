//! JSON model reader.

use std::path::{Path, PathBuf};

use recurra_forest::{Model, ModelDocument, ModelStore};
use tracing::{error, info, instrument};

use crate::IoError;

/// Reads an exported random survival forest from a JSON file.
///
/// Expected document:
///
/// ```json
/// {
///   "feature_names": ["age", "tsize", ...],
///   "n_estimators": 5,
///   "trees": [{"children_left": [...], "children_right": [...],
///              "feature": [...], "threshold": [...], "n_node_samples": [...]}],
///   "risk_percentiles": {"p25": 2.1, "p50": 2.8, "p75": 3.3},
///   "c_index": 0.69
/// }
/// ```
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::ParseModel`] | Not JSON, or fields missing / of the wrong type |
/// | [`IoError::InvalidModel`] | Document violates a model invariant |
pub struct ModelReader {
    path: PathBuf,
}

impl ModelReader {
    /// Create a new reader for the given model file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read, parse, and validate the model.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Model, IoError> {
        let bytes = std::fs::read(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let document: ModelDocument =
            serde_json::from_slice(&bytes).map_err(|e| IoError::ParseModel {
                path: self.path.clone(),
                source: e,
            })?;

        let model = Model::from_document(document).map_err(|e| IoError::InvalidModel {
            path: self.path.clone(),
            source: e,
        })?;

        info!(
            n_trees = model.n_trees(),
            n_features = model.n_features(),
            c_index = model.c_index(),
            "model loaded"
        );
        Ok(model)
    }

    /// Read the model into a [`ModelStore`].
    ///
    /// A failed load is logged and yields [`ModelStore::NotReady`]; predictions
    /// against that store fail with `ModelNotLoaded`. No retry is attempted.
    pub fn into_store(self) -> ModelStore {
        match self.read() {
            Ok(model) => ModelStore::ready(model),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "model load failed");
                ModelStore::NotReady
            }
        }
    }
}
