//! Patient input readers: CSV cohorts and single-patient JSON.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use recurra_forest::PatientFeatures;
use tracing::{debug, info, instrument};

use crate::domain::{PatientDataset, PatientId};
use crate::IoError;

/// Reads a cohort of patients from a CSV file.
///
/// Expected CSV format:
/// - Header row required (first column is patient_id, remaining are feature names)
/// - `patient_id,age,tsize,pnodes,...`
/// - One row per patient, all rows must have the same number of columns
///
/// Cells are not parsed here. An unparseable value surfaces later as an
/// `InvalidFeatureValue` for that patient only.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Only the patient_id column |
/// | [`IoError::DuplicateFeatureColumn`] | A feature column name appears twice |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptyPatientId`] | First cell of a row is blank |
/// | [`IoError::DuplicatePatientId`] | Same patient_id appears twice |
pub struct PatientReader {
    path: PathBuf,
}

impl PatientReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`PatientDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<PatientDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own InconsistentRowLength check fire instead
        // of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        if expected_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let feature_names: Vec<String> = header.iter().skip(1).map(String::from).collect();

        let mut columns = HashSet::new();
        if let Some(name) = feature_names.iter().find(|name| !columns.insert(name.as_str())) {
            return Err(IoError::DuplicateFeatureColumn {
                path: self.path.clone(),
                name: name.clone(),
            });
        }

        let mut patient_ids = Vec::new();
        let mut patients = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            let id = record.get(0).unwrap_or("").to_string();

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    patient_id: id,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            if id.is_empty() {
                return Err(IoError::EmptyPatientId {
                    path: self.path.clone(),
                    row_index,
                });
            }

            if let Some(&first_row) = seen.get(&id) {
                return Err(IoError::DuplicatePatientId {
                    path: self.path.clone(),
                    patient_id: id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(id.clone(), row_index);

            let patient: PatientFeatures = feature_names
                .iter()
                .zip(record.iter().skip(1))
                .map(|(name, raw)| (name.clone(), raw))
                .collect();

            patient_ids.push(PatientId::new(id));
            patients.push(patient);
        }

        if patient_ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_patients = patient_ids.len(),
            n_features = feature_names.len(),
            "patient dataset loaded"
        );

        Ok(PatientDataset::new(patient_ids, feature_names, patients))
    }
}

/// Read a single patient from a JSON object of feature values.
///
/// Values may be numbers or strings, e.g. `{"age": 52, "horTh": "1"}`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::ParsePatient`] | Not a JSON object |
#[instrument(fields(path = %path.display()))]
pub fn read_patient_json(path: &Path) -> Result<PatientFeatures, IoError> {
    let bytes = std::fs::read(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let patient: PatientFeatures =
        serde_json::from_slice(&bytes).map_err(|e| IoError::ParsePatient {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!(n_features = patient.len(), "patient loaded");
    Ok(patient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recurra_forest::FeatureValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_patients() {
        let csv = "patient_id,age,tsize\nP01,40,10\nP02, 60 ,25.5\n";
        let f = write_file(csv);
        let ds = PatientReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_patients(), 2);
        assert_eq!(ds.feature_names(), &["age", "tsize"]);
        assert_eq!(ds.patient_ids()[1].as_str(), "P02");
        assert_eq!(
            ds.patients()[1].get("age"),
            Some(&FeatureValue::Text("60".into()))
        );
    }

    #[test]
    fn blank_cells_are_kept_for_the_evaluator() {
        let csv = "patient_id,age,tsize\nP01,,10\n";
        let f = write_file(csv);
        let ds = PatientReader::new(f.path()).read().unwrap();
        assert_eq!(ds.patients()[0].get("age"), Some(&FeatureValue::Text(String::new())));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_file("patient_id,age\n");
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn no_feature_columns_error() {
        let f = write_file("patient_id\nP01\n");
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::NoFeatureColumns { .. }));
    }

    #[test]
    fn duplicate_feature_column_error() {
        let f = write_file("patient_id,age,tsize,age\nP01,40,10,41\n");
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateFeatureColumn { name, .. } if name == "age"));
    }

    #[test]
    fn duplicate_patient_id_error() {
        let f = write_file("patient_id,age\nP01,40\nP01,41\n");
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::DuplicatePatientId {
                first_row: 0,
                second_row: 1,
                ..
            }
        ));
    }

    #[test]
    fn empty_patient_id_error() {
        let f = write_file("patient_id,age\n,40\n");
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyPatientId { row_index: 0, .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_file("patient_id,age,tsize\nP01,40,10\nP02,60\n");
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InconsistentRowLength { row_index: 1, .. }));
    }

    #[test]
    fn read_patient_json_mixed_values() {
        let f = write_file(r#"{"age": 52, "horTh": "1"}"#);
        let patient = read_patient_json(f.path()).unwrap();
        assert_eq!(patient.get("age"), Some(&FeatureValue::Number(52.0)));
        assert_eq!(patient.get("horTh"), Some(&FeatureValue::Text("1".into())));
    }

    #[test]
    fn read_patient_json_rejects_arrays() {
        let f = write_file("[52, 1]");
        let err = read_patient_json(f.path()).unwrap_err();
        assert!(matches!(err, IoError::ParsePatient { .. }));
    }
}
