/// Flood risk predictor: trained model with a rule-based fallback.
///
/// The predictor is built once at startup from an optional model handle and
/// then shared read-only by every request. There is no reload path.
///
/// Failure handling:
/// - Artifact missing or unreadable at startup → logged, the predictor is
///   rule-based for the lifetime of the process.
/// - Model error (or non-finite output) on one call → logged, that call is
///   scored by the rules. The model is still tried on the next call.

use std::path::Path;
use std::sync::Arc;

use crate::features::{build_features, FeatureVector};
use crate::model::{round_to, DischargeObservation, ModelError, ModelProvenance, RiskAssessment, WeatherObservation};

use super::artifact::{load_artifact, RegressionModel};
use super::classify::{classify, explain};
use super::rules::rule_based_risk;

/// Probability plus the path that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub provenance: ModelProvenance,
}

#[derive(Clone)]
pub struct RiskPredictor {
    model: Option<Arc<dyn RegressionModel>>,
}

impl std::fmt::Debug for RiskPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskPredictor")
            .field("model", &self.model_description())
            .finish()
    }
}

impl RiskPredictor {
    /// Predictor with no trained model.
    pub fn rule_based() -> Self {
        Self { model: None }
    }

    pub fn with_model(model: Arc<dyn RegressionModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Loads the trained artifact at `path`, falling back to rules on any
    /// load failure.
    pub fn from_artifact(path: &Path) -> Self {
        match load_artifact(path) {
            Ok(ensemble) => {
                log::info!("Loaded trained model from {} ({} trees)", path.display(), ensemble.trees.len());
                Self::with_model(Arc::new(ensemble))
            }
            Err(ModelError::NotFound(p)) => {
                log::info!("No trained model found at {}. Using rule-based prediction.", p);
                Self::rule_based()
            }
            Err(e) => {
                log::warn!("Failed to load model: {}. Using rule-based fallback.", e);
                Self::rule_based()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_description(&self) -> Option<String> {
        self.model.as_ref().map(|m| m.describe())
    }

    /// Scores a feature vector in [0, 1].
    ///
    /// `provenance` names the path that produced this probability, not
    /// whether a model is loaded: a loaded model that fails on this call
    /// yields `RuleBased`. Use `has_model` for the latter.
    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        if let Some(model) = &self.model {
            match model.predict(features) {
                Ok(raw) if raw.is_finite() => {
                    return Prediction {
                        probability: raw.clamp(0.0, 1.0),
                        provenance: ModelProvenance::Trained,
                    };
                }
                Ok(raw) => {
                    log::warn!("Model returned non-finite output {}. Falling back to rules.", raw);
                }
                Err(e) => {
                    log::warn!("Model prediction failed: {}. Falling back to rules.", e);
                }
            }
        }

        Prediction {
            probability: rule_based_risk(features),
            provenance: ModelProvenance::RuleBased,
        }
    }

    /// Full assessment for a pair of observations.
    pub fn assess(&self, weather: &WeatherObservation, discharge: &DischargeObservation) -> RiskAssessment {
        self.assess_features(build_features(weather, discharge))
    }

    pub fn assess_features(&self, features: FeatureVector) -> RiskAssessment {
        let prediction = self.predict(&features);
        let (risk_level, recommendation) = classify(prediction.probability);

        RiskAssessment {
            risk_level,
            probability: round_to(prediction.probability, 3),
            risk_score: round_to(prediction.probability * 10.0, 1),
            contributing_factors: explain(&features),
            recommendation: recommendation.to_string(),
            model: prediction.provenance,
            features_used: features,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
