//! File I/O, validation, and serialization for the recurra pipeline.

mod domain;
mod error;
mod model_reader;
mod patient_reader;
mod writer;

pub use domain::{ExperimentName, PatientDataset, PatientId};
pub use error::IoError;
pub use model_reader::ModelReader;
pub use patient_reader::{PatientReader, read_patient_json};
pub use writer::{PredictionsSummary, ResultWriter};
