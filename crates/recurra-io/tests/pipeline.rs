//! End-to-end integration tests: JSON model + CSV patients -> predictions -> JSON.

use std::fs;
use std::path::Path;

use recurra_forest::{ForestError, RiskGroup};
use recurra_io::{ExperimentName, ModelReader, PatientReader, ResultWriter, read_patient_json};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn batch_round_trip() {
    // 1. Load model and patients
    let model_path = fixture_path("rsf_model_small.json");
    let model = ModelReader::new(&model_path)
        .read()
        .expect("fixture model should load");
    assert_eq!(model.n_trees(), 3);
    assert_eq!(model.c_index(), Some(0.69));

    let dataset = PatientReader::new(&fixture_path("patients_4.csv"))
        .read()
        .expect("fixture patients should parse");
    assert_eq!(dataset.n_patients(), 4);

    // 2. Predict
    let outcomes = model.predict_batch(dataset.patients());
    assert_eq!(outcomes[0].as_ref().unwrap().risk_group, RiskGroup::High);
    assert_eq!(outcomes[1].as_ref().unwrap().risk_group, RiskGroup::Medium);
    assert_eq!(
        outcomes[3],
        Err(ForestError::InvalidFeatureValue {
            name: "tsize".into()
        })
    );

    // 3. Write JSON artifact
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("cohort_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    let summary = writer
        .write_predictions(&model_path, dataset.patient_ids(), &outcomes)
        .unwrap();
    assert_eq!(summary.n_failed, 1);

    // 4. Deserialize back and verify
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "cohort_rt");
    assert_eq!(content["nPatients"], 4);
    assert_eq!(content["nFailed"], 1);

    let predictions = content["predictions"].as_array().unwrap();
    let ids: Vec<&str> = predictions
        .iter()
        .map(|p| p["patientId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["P001", "P002", "P003", "P004"]);
    assert!((predictions[1]["riskScore"].as_f64().unwrap() - 2.44).abs() < 1e-12);

    let counted: u64 = content["tierCounts"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(counted, 3);
}

#[test]
fn thresholds_route_left_on_ties() {
    let model = ModelReader::new(&fixture_path("rsf_model_small.json"))
        .read()
        .unwrap();
    let dataset = PatientReader::new(&fixture_path("patients_4.csv"))
        .read()
        .unwrap();
    // P003 sits exactly on the thresholds: pnodes 3.5, tgrade 2.5,
    // tsize 20.5, age 53.5 -> leaves 300, 380, 410.
    let result = model.predict(&dataset.patients()[2]).unwrap();
    assert!((result.risk_score - 10.9 / 3.0).abs() < 1e-12);
    assert_eq!(result.risk_group, RiskGroup::High);
}

#[test]
fn single_patient_json() {
    let model = ModelReader::new(&fixture_path("rsf_model_small.json"))
        .read()
        .unwrap();
    let patient = read_patient_json(&fixture_path("patient_single.json")).unwrap();
    let result = model.predict(&patient).unwrap();
    assert_eq!(result.to_string(), "2.440 (Medium)");
}

#[test]
fn failed_load_leaves_store_not_ready() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.json");
    fs::write(&path, "{\"feature_names\": [").unwrap();

    let store = ModelReader::new(&path).into_store();
    let patient = read_patient_json(&fixture_path("patient_single.json")).unwrap();
    assert_eq!(store.predict(&patient), Err(ForestError::ModelNotLoaded));
}
