/// Flood risk scoring.
///
/// Submodules:
/// - `rules`     - deterministic band-table scorer used when no model is available
/// - `artifact`  - trained tree-ensemble artifact: format, schema guard, load/save
/// - `classify`  - probability → risk level + recommendation, contributing factors
/// - `predictor` - model-or-rules dispatch and full assessment assembly

pub mod artifact;
pub mod classify;
pub mod predictor;
pub mod rules;

pub use artifact::{RegressionModel, TreeEnsemble};
pub use classify::{classify, explain};
pub use predictor::{Prediction, RiskPredictor};
pub use rules::rule_based_risk;
