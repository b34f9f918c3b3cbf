use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use recurra_forest::{
    FeatureVector, Model, ModelStore, ModelSummary, PatientFeatures, PredictionResult, RiskGroup,
    build_feature_vector,
};
use recurra_io::{ExperimentName, ModelReader, PatientReader, ResultWriter, read_patient_json};

#[derive(Parser)]
#[command(name = "recurra")]
#[command(about = "Breast-cancer recurrence risk scoring with a random survival forest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for batch prediction (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a structural summary of a model file
    Inspect {
        /// Path to the exported model JSON
        #[arg(long)]
        model: PathBuf,
    },

    /// Score a single patient
    Predict {
        /// Path to the exported model JSON
        #[arg(long)]
        model: PathBuf,

        /// JSON file mapping feature names to values
        #[arg(long, conflicts_with = "feature")]
        patient: Option<PathBuf>,

        /// Feature value as name=value (repeatable)
        #[arg(long = "feature", value_name = "NAME=VALUE", value_parser = parse_feature)]
        feature: Vec<(String, String)>,

        /// Include each tree's leaf sample count in the output
        #[arg(long, default_value_t = false)]
        explain: bool,
    },

    /// Score every patient in a CSV file and write a predictions artifact
    Batch {
        /// Path to the exported model JSON
        #[arg(long)]
        model: PathBuf,

        /// Path to the patient CSV file (patient_id, then one column per feature)
        #[arg(long)]
        patients: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictOutput {
    #[serde(flatten)]
    result: PredictionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree_outputs: Option<Vec<usize>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchOutput {
    experiment: String,
    n_patients: usize,
    n_failed: usize,
    n_low: usize,
    n_medium: usize,
    n_high: usize,
    output: PathBuf,
}

#[derive(Serialize)]
struct InspectOutput {
    model: PathBuf,
    #[serde(flatten)]
    summary: ModelSummary,
}

fn parse_feature(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got \"{s}\"")),
    }
}

fn load_model(path: &Path) -> Result<Model> {
    ModelReader::new(path)
        .read()
        .with_context(|| format!("failed to load model {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Inspect { model } => {
            let forest = load_model(&model)?;

            let output = InspectOutput {
                model,
                summary: forest.summary(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            patient,
            feature,
            explain,
        } => {
            let store = ModelStore::from(load_model(&model)?);
            let forest = store.model()?;

            let inputs: PatientFeatures = match patient {
                Some(path) => read_patient_json(&path).context("failed to read patient file")?,
                None => feature.into_iter().collect(),
            };

            let result = store.predict(&inputs).context("prediction failed")?;
            let tree_outputs = if explain {
                let vector: FeatureVector = build_feature_vector(forest, &inputs)?;
                Some(forest.tree_outputs(&vector)?)
            } else {
                None
            };
            info!(%result, "patient scored");

            let output = PredictOutput {
                result,
                tree_outputs,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Batch {
            model,
            patients,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let forest = load_model(&model)?;

            // 2. Read patients
            let dataset = PatientReader::new(&patients)
                .read()
                .context("failed to read patient CSV")?;
            info!(n_patients = dataset.n_patients(), "patients loaded");

            // 3. Predict
            let outcomes = forest.predict_batch(dataset.patients());

            // 4. Write predictions JSON
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let summary = writer.write_predictions(&model, dataset.patient_ids(), &outcomes)?;
            info!(n_failed = summary.n_failed, "batch prediction complete");

            // 5. Print summary
            let output = BatchOutput {
                experiment,
                n_patients: summary.n_patients,
                n_failed: summary.n_failed,
                n_low: summary.count(RiskGroup::Low),
                n_medium: summary.count(RiskGroup::Medium),
                n_high: summary.count(RiskGroup::High),
                output: summary.path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_feature_pairs() {
        assert_eq!(
            parse_feature("age=52").unwrap(),
            ("age".to_string(), "52".to_string())
        );
        assert_eq!(
            parse_feature("tsize=").unwrap(),
            ("tsize".to_string(), String::new())
        );
        assert!(parse_feature("age").is_err());
        assert!(parse_feature("=52").is_err());
    }

    #[test]
    fn predict_accepts_repeated_features() {
        let cli = Cli::try_parse_from([
            "recurra", "predict", "--model", "m.json", "--feature", "age=40", "--feature",
            "tsize=10",
        ])
        .unwrap();
        match cli.command {
            Command::Predict { feature, .. } => assert_eq!(feature.len(), 2),
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn load_failure_keeps_cause() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = dir.path().join("absent.json");
        let message = format!("{:#}", load_model(&missing).unwrap_err());
        assert!(message.contains("absent.json"), "{message}");
        assert!(message.contains("file not found"), "{message}");

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "{ not json").unwrap();
        let message = format!("{:#}", load_model(&garbled).unwrap_err());
        assert!(message.contains("cannot parse model document"), "{message}");
    }

    #[test]
    fn patient_file_conflicts_with_features() {
        let parsed = Cli::try_parse_from([
            "recurra", "predict", "--model", "m.json", "--patient", "p.json", "--feature",
            "age=40",
        ]);
        assert!(parsed.is_err());
    }
}
