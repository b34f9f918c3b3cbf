//! JSON result writer for batch predictions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use recurra_forest::{ForestError, PredictionResult, RiskGroup};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{ExperimentName, PatientId};
use crate::IoError;

/// Counts recorded in a written predictions artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionsSummary {
    /// Path of the artifact.
    pub path: PathBuf,
    /// Number of patients written, failed ones included.
    pub n_patients: usize,
    /// Number of patients whose prediction failed.
    pub n_failed: usize,
    /// Successful predictions per tier. Every tier is present.
    pub tier_counts: BTreeMap<RiskGroup, usize>,
}

impl PredictionsSummary {
    /// Return the number of patients assigned to `group`.
    #[must_use]
    pub fn count(&self, group: RiskGroup) -> usize {
        self.tier_counts.get(&group).copied().unwrap_or(0)
    }
}

/// Writes prediction results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_predictions.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the path predictions are written to.
    #[must_use]
    pub fn predictions_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_predictions.json", self.experiment.as_str()))
    }

    /// Write per-patient outcomes to `{experiment}_predictions.json`.
    ///
    /// `patient_ids[i]` corresponds to `outcomes[i]`. Failed patients are
    /// recorded with their error message and excluded from the tier counts.
    /// The counts written to the file are returned as a [`PredictionsSummary`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_patients = patient_ids.len()))]
    pub fn write_predictions(
        &self,
        model_path: &Path,
        patient_ids: &[PatientId],
        outcomes: &[Result<PredictionResult, ForestError>],
    ) -> Result<PredictionsSummary, IoError> {
        let path = self.predictions_path();

        let mut tier_counts: BTreeMap<RiskGroup, usize> =
            RiskGroup::ALL.iter().map(|&group| (group, 0)).collect();
        let mut n_failed = 0;

        let predictions: Vec<PredictionEntry> = patient_ids
            .iter()
            .zip(outcomes)
            .map(|(id, outcome)| match outcome {
                Ok(result) => {
                    *tier_counts.entry(result.risk_group).or_default() += 1;
                    PredictionEntry {
                        patient_id: id.as_str(),
                        result: Some(*result),
                        error: None,
                    }
                }
                Err(e) => {
                    n_failed += 1;
                    PredictionEntry {
                        patient_id: id.as_str(),
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let n_patients = predictions.len();
        let artifact = PredictionsArtifact {
            experiment: self.experiment.as_str(),
            model: model_path.display().to_string(),
            n_patients,
            n_failed,
            tier_counts: &tier_counts,
            predictions,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        drop(artifact);
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), n_failed, "predictions written");
        Ok(PredictionsSummary {
            path,
            n_patients,
            n_failed,
            tier_counts,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictionsArtifact<'a> {
    experiment: &'a str,
    model: String,
    n_patients: usize,
    n_failed: usize,
    tier_counts: &'a BTreeMap<RiskGroup, usize>,
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictionEntry<'a> {
    patient_id: &'a str,
    #[serde(flatten)]
    result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(list: &[&str]) -> Vec<PatientId> {
        list.iter().map(|s| PatientId::new(s.to_string())).collect()
    }

    #[test]
    fn write_predictions_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("test_run".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let outcomes = vec![
            Ok(PredictionResult {
                risk_score: 0.2,
                risk_group: RiskGroup::Low,
            }),
            Err(ForestError::InvalidFeatureValue {
                name: "tsize".into(),
            }),
            Ok(PredictionResult {
                risk_score: 0.8123,
                risk_group: RiskGroup::High,
            }),
        ];
        let summary = writer
            .write_predictions(Path::new("rsf_model.json"), &ids(&["P1", "P2", "P3"]), &outcomes)
            .unwrap();
        assert_eq!(summary.path, dir.path().join("test_run_predictions.json"));

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary.path).unwrap()).unwrap();

        assert_eq!(content["experiment"], "test_run");
        assert_eq!(content["nPatients"], 3);
        assert_eq!(content["nFailed"], 1);
        assert_eq!(content["tierCounts"]["Low"], 1);
        assert_eq!(content["tierCounts"]["Medium"], 0);
        assert_eq!(content["tierCounts"]["High"], 1);

        let predictions = content["predictions"].as_array().unwrap();
        assert_eq!(predictions[0]["patientId"], "P1");
        assert_eq!(predictions[0]["riskGroup"], "Low");
        assert!(predictions[1]["error"].as_str().unwrap().contains("tsize"));
        assert!(predictions[1].get("riskScore").is_none());
        assert!((predictions[2]["riskScore"].as_f64().unwrap() - 0.812).abs() < 1e-12);
    }

    #[test]
    fn summary_matches_written_counts() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("counts".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let medium = PredictionResult {
            risk_score: 0.45,
            risk_group: RiskGroup::Medium,
        };
        let outcomes = vec![
            Ok(medium),
            Ok(medium),
            Err(ForestError::ModelNotLoaded),
        ];
        let summary = writer
            .write_predictions(Path::new("m.json"), &ids(&["A", "B", "C"]), &outcomes)
            .unwrap();
        assert_eq!(summary.n_patients, 3);
        assert_eq!(summary.n_failed, 1);
        assert_eq!(summary.count(RiskGroup::Low), 0);
        assert_eq!(summary.count(RiskGroup::Medium), 2);
        assert_eq!(summary.count(RiskGroup::High), 0);

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary.path).unwrap()).unwrap();
        assert_eq!(content["nPatients"], summary.n_patients);
        assert_eq!(content["nFailed"], summary.n_failed);
        for group in RiskGroup::ALL {
            assert_eq!(content["tierCounts"][group.as_str()], summary.count(group));
        }
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let experiment = ExperimentName::new("nested".into()).unwrap();
        ResultWriter::new(&nested, experiment).unwrap();
        assert!(nested.is_dir());
    }
}
