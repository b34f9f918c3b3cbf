//! Domain types for recurra-io.

use recurra_forest::PatientFeatures;

use crate::IoError;

/// A patient identifier from the first column of a patient CSV.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatientId(String);

impl PatientId {
    /// Create a new patient ID from a non-empty string.
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "patient ID must not be empty");
        Self(id)
    }

    /// Return the patient ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Patients read from a CSV file.
///
/// Produced by [`PatientReader`](crate::PatientReader). IDs and feature sets
/// are stored in parallel vectors: `patient_ids[i]` corresponds to
/// `patients[i]`. Cell values stay as raw text so that numeric validation
/// happens in the evaluator, per feature name.
#[derive(Debug)]
pub struct PatientDataset {
    patient_ids: Vec<PatientId>,
    feature_names: Vec<String>,
    patients: Vec<PatientFeatures>,
}

impl PatientDataset {
    /// Create a new patient dataset.
    pub(crate) fn new(
        patient_ids: Vec<PatientId>,
        feature_names: Vec<String>,
        patients: Vec<PatientFeatures>,
    ) -> Self {
        Self { patient_ids, feature_names, patients }
    }

    /// Return the patient IDs in file order.
    #[must_use]
    pub fn patient_ids(&self) -> &[PatientId] {
        &self.patient_ids
    }

    /// Return the feature column names from the CSV header.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the per-patient feature sets in file order.
    #[must_use]
    pub fn patients(&self) -> &[PatientFeatures] {
        &self.patients
    }

    /// Return the number of patients.
    #[must_use]
    pub fn n_patients(&self) -> usize {
        self.patient_ids.len()
    }
}
