/// Deterministic rule-based flood risk scorer.
///
/// Used whenever no trained model is loaded, and for any single call in
/// which the trained model fails. Four signals each contribute the score of
/// the highest band they exceed; contributions are summed and the total is
/// clamped to [0, 1].

use crate::features::FeatureVector;

/// (exclusive lower bound, contribution) pairs, highest band first.
type Bands = &'static [(f64, f64)];

/// Rainfall intensity, mm / 24h. The dominant signal.
const RAINFALL_24H_BANDS: Bands = &[(200.0, 0.40), (100.0, 0.30), (50.0, 0.20), (20.0, 0.10)];

/// Cumulative rainfall, mm / 7 days.
const RAINFALL_7D_BANDS: Bands = &[(500.0, 0.25), (200.0, 0.15), (100.0, 0.08)];

/// Soil saturation fraction; saturated ground amplifies runoff.
const SOIL_MOISTURE_BANDS: Bands = &[(0.8, 0.20), (0.5, 0.10)];

/// Current river discharge, m³/s.
const RIVER_DISCHARGE_BANDS: Bands = &[(5000.0, 0.15), (1000.0, 0.08), (100.0, 0.03)];

/// Contribution of the highest band strictly exceeded by `value`.
fn band_score(value: f64, bands: Bands) -> f64 {
    bands
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map(|(_, score)| *score)
        .unwrap_or(0.0)
}

/// Scores a feature vector in [0, 1] from the band tables above.
pub fn rule_based_risk(features: &FeatureVector) -> f64 {
    let score = band_score(features.rainfall_24h(), RAINFALL_24H_BANDS)
        + band_score(features.rainfall_7d(), RAINFALL_7D_BANDS)
        + band_score(features.soil_moisture(), SOIL_MOISTURE_BANDS)
        + band_score(features.river_discharge(), RIVER_DISCHARGE_BANDS);

    score.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
