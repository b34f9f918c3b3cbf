//! Random survival forest evaluation for recurrence-risk scoring.
//!
//! Validates an exported forest once at load time, then scores patients by
//! walking every tree to a leaf, averaging the leaf sample counts,
//! normalizing, and bucketing the score into a Low / Medium / High tier with
//! fixed percentile cut points. Pure computation, zero I/O.

mod error;
mod features;
mod model;
mod node;
mod predict;
mod risk;
mod store;
mod tree;

pub use error::ForestError;
pub use features::{FeatureValue, FeatureVector, PatientFeatures, build_feature_vector};
pub use model::{Model, ModelDocument, ModelSummary, RiskPercentiles};
pub use node::{FeatureIndex, Node, NodeIndex};
pub use predict::{aggregate, evaluate_tree, predict};
pub use risk::{PredictionResult, RiskGroup, SCORE_DECIMALS, SCORE_SCALE, classify, normalize, round_score};
pub use store::ModelStore;
pub use tree::{SurvivalTree, TREE_LEAF, TreeArrays};
