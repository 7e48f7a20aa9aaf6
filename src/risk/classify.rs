/// Risk classification and contributing-factor explanation.
///
/// `classify` partitions [0, 1] into four ordered levels; each level carries
/// one fixed recommendation string that downstream consumers display
/// verbatim. `explain` lists the observations that drove the score.

use crate::features::FeatureVector;
use crate::model::{ContributingFactor, RiskLevel};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

pub const SEVERE_THRESHOLD: f64 = 0.75;
pub const HIGH_THRESHOLD: f64 = 0.5;
pub const MODERATE_THRESHOLD: f64 = 0.25;

pub const RECOMMENDATION_SEVERE: &str =
    "Immediate evacuation recommended. Contact NDRF helpline 1078.";
pub const RECOMMENDATION_HIGH: &str =
    "Prepare for possible flooding. Move valuables to higher ground.";
pub const RECOMMENDATION_MODERATE: &str = "Stay alert. Monitor weather updates and river levels.";
pub const RECOMMENDATION_LOW: &str = "No immediate flood risk. Continue routine monitoring.";

/// Maps a probability to its risk level and recommendation.
///
/// Boundaries belong to the higher band: 0.25 is MODERATE, 0.5 is HIGH,
/// 0.75 is SEVERE.
pub fn classify(probability: f64) -> (RiskLevel, &'static str) {
    if probability >= SEVERE_THRESHOLD {
        (RiskLevel::Severe, RECOMMENDATION_SEVERE)
    } else if probability >= HIGH_THRESHOLD {
        (RiskLevel::High, RECOMMENDATION_HIGH)
    } else if probability >= MODERATE_THRESHOLD {
        (RiskLevel::Moderate, RECOMMENDATION_MODERATE)
    } else {
        (RiskLevel::Low, RECOMMENDATION_LOW)
    }
}

// ---------------------------------------------------------------------------
// Explanation
// ---------------------------------------------------------------------------

pub const MAX_FACTORS: usize = 5;

fn factor(name: &str, value: String, impact: RiskLevel) -> ContributingFactor {
    ContributingFactor {
        factor: name.to_string(),
        value,
        impact,
    }
}

/// Lists up to five contributing factors in fixed evaluation order.
///
/// Rules are evaluated independently, so a 24h rainfall above 50 mm yields
/// both the "Heavy Rainfall (24h)" and the "Moderate Rainfall" entry, and
/// soil above 70% yields both soil entries. Entries are not re-sorted by
/// impact before truncation. When nothing triggers, a single "Normal
/// Conditions" entry is returned.
pub fn explain(features: &FeatureVector) -> Vec<ContributingFactor> {
    let rainfall_24h = features.rainfall_24h();
    let rainfall_7d = features.rainfall_7d();
    let soil = features.soil_moisture();
    let discharge = features.river_discharge();

    let mut factors = Vec::new();

    if rainfall_24h > 50.0 {
        factors.push(factor("Heavy Rainfall (24h)", format!("{:.1}mm", rainfall_24h), RiskLevel::High));
    }
    if rainfall_7d > 200.0 {
        factors.push(factor("Cumulative Rainfall (7d)", format!("{:.1}mm", rainfall_7d), RiskLevel::High));
    }
    if soil > 0.7 {
        factors.push(factor("Soil Saturation", format!("{:.0}%", soil * 100.0), RiskLevel::High));
    }
    if discharge > 1000.0 {
        factors.push(factor("River Discharge", format!("{:.0} m³/s", discharge), RiskLevel::High));
    }
    if rainfall_24h > 20.0 {
        factors.push(factor("Moderate Rainfall", format!("{:.1}mm", rainfall_24h), RiskLevel::Moderate));
    }
    if soil > 0.4 {
        factors.push(factor("Elevated Soil Moisture", format!("{:.0}%", soil * 100.0), RiskLevel::Moderate));
    }

    if factors.is_empty() {
        factors.push(factor(
            "Normal Conditions",
            "All parameters within safe range".to_string(),
            RiskLevel::Low,
        ));
    }

    factors.truncate(MAX_FACTORS);
    factors
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
