/// Integration tests for end-to-end flood risk assessment
///
/// These tests drive the public API the way the service does: observation
/// records in, risk assessment and alerts out. No network access; upstream
/// behaviour is replaced with an in-process `ObservationSource`.
///
/// Run with: cargo test --test assessment_scenarios

use chrono::{DateTime, TimeZone, Utc};
use floodrisk_service::alert::derive_alerts_at;
use floodrisk_service::features::{build_features, FEATURE_COUNT};
use floodrisk_service::ingest::ObservationSource;
use floodrisk_service::model::{
    AlertType, DischargeObservation, FetchError, ModelError, ModelProvenance, RiskLevel, WeatherObservation,
};
use floodrisk_service::features::FeatureVector;
use floodrisk_service::risk::artifact::{save_artifact, RegressionTree, TreeNode};
use floodrisk_service::risk::{RegressionModel, RiskPredictor, TreeEnsemble};
use floodrisk_service::service::FloodService;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 9, 20, 0).unwrap()
}

fn weather_from_json(json: &str) -> WeatherObservation {
    serde_json::from_str(json).expect("weather fixture should deserialize")
}

fn discharge_from_json(json: &str) -> DischargeObservation {
    serde_json::from_str(json).expect("discharge fixture should deserialize")
}

struct FixedSource {
    weather: WeatherObservation,
    discharge: DischargeObservation,
}

impl ObservationSource for FixedSource {
    fn weather(&self, _lat: f64, _lon: f64) -> Result<WeatherObservation, FetchError> {
        Ok(self.weather.clone())
    }

    fn discharge(&self, _lat: f64, _lon: f64) -> DischargeObservation {
        self.discharge.clone()
    }
}

/// Always fails, so every call must be scored by the rules.
struct BrokenModel;

impl RegressionModel for BrokenModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Err(ModelError::Inference("corrupt tree".to_string()))
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

// ---------------------------------------------------------------------------
// 1. End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_monsoon_flood_is_severe_without_model() {
    let weather = weather_from_json(
        r#"{"rainfall_24h": 250, "rainfall_7d": 600, "soil_moisture": 0.9,
            "humidity": 90, "temperature": 30, "wind_speed": 10, "weather_code": 65}"#,
    );
    let discharge = discharge_from_json(r#"{"current_discharge": 6000, "max_discharge_7d": 6500}"#);

    let assessment = RiskPredictor::rule_based().assess(&weather, &discharge);

    assert_eq!(assessment.risk_level, RiskLevel::Severe);
    assert_eq!(assessment.probability, 1.0);
    assert_eq!(assessment.risk_score, 10.0);
    assert_eq!(assessment.model, ModelProvenance::RuleBased);
    assert_eq!(
        assessment.recommendation,
        "Immediate evacuation recommended. Contact NDRF helpline 1078."
    );
    assert_eq!(assessment.contributing_factors.len(), 5);
}

#[test]
fn test_empty_observations_are_low_and_all_clear() {
    let weather = WeatherObservation::default();
    let discharge = DischargeObservation::default();

    let assessment = RiskPredictor::rule_based().assess(&weather, &discharge);
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert_eq!(assessment.probability, 0.0);
    assert_eq!(assessment.contributing_factors.len(), 1);
    assert_eq!(assessment.contributing_factors[0].factor, "Normal Conditions");

    let alerts = derive_alerts_at(&weather, fixed_now());
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::AllClear);
    assert_eq!(alerts[0].severity, RiskLevel::Low);
}

#[test]
fn test_extreme_rain_alone_raises_single_alert() {
    let weather = weather_from_json(r#"{"rainfall_24h": 120}"#);

    let alerts = derive_alerts_at(&weather, fixed_now());

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::ExtremeRainfall);
    assert_eq!(alerts[0].severity, RiskLevel::Severe);
    assert_eq!(alerts[0].id, "RAIN-2024071509");
}

#[test]
fn test_garbage_fields_fall_back_to_defaults() {
    let weather = weather_from_json(
        r#"{"rainfall_24h": "lots", "humidity": null, "temperature": "31.5", "weather_code": [1]}"#,
    );
    let features = build_features(&weather, &DischargeObservation::default());

    assert_eq!(features.rainfall_24h(), 0.0);
    assert_eq!(features.get("humidity"), Some(50.0));
    assert_eq!(features.get("temperature"), Some(31.5));
    assert_eq!(features.get("weather_code"), Some(0.0));
}

// ---------------------------------------------------------------------------
// 2. Model loading and fallback
// ---------------------------------------------------------------------------

#[test]
fn test_failing_model_is_isolated_per_call() {
    let predictor = RiskPredictor::with_model(Arc::new(BrokenModel));
    let weather = weather_from_json(r#"{"rainfall_24h": 60, "soil_moisture": 0.6}"#);

    for _ in 0..3 {
        let assessment = predictor.assess(&weather, &DischargeObservation::default());
        assert_eq!(assessment.model, ModelProvenance::RuleBased);
        // 0.20 (24h > 50) + 0.10 (soil > 0.5)
        assert_eq!(assessment.probability, 0.3);
        assert_eq!(assessment.risk_level, RiskLevel::Moderate);
    }
}

#[test]
fn test_saved_artifact_drives_service_predictions() {
    // Single split on rainfall_24h: < 100 mm → 0.1, otherwise 0.9
    let tree = RegressionTree {
        nodes: vec![
            TreeNode::Split { feature: 0, threshold: 100.0, left: 1, right: 2 },
            TreeNode::Leaf { value: 0.0 },
            TreeNode::Leaf { value: 0.8 },
        ],
    };
    let ensemble = TreeEnsemble::new(0.1, vec![tree]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flood_model.json");
    save_artifact(&ensemble, &path).unwrap();

    let predictor = RiskPredictor::from_artifact(&path);
    assert!(predictor.has_model());

    let service = FloodService::new(
        predictor,
        Arc::new(FixedSource {
            weather: weather_from_json(r#"{"rainfall_24h": 150}"#),
            discharge: DischargeObservation::unavailable(26.14, 91.74, "offline"),
        }),
        2,
    );

    let report = service.report_at(26.14, 91.74, fixed_now()).unwrap();
    assert_eq!(report.risk.model, ModelProvenance::Trained);
    assert_eq!(report.risk.probability, 0.9);
    assert_eq!(report.risk.risk_level, RiskLevel::Severe);
    assert!(report.discharge.is_unavailable());
    assert_eq!(report.alerts[0].alert_type, AlertType::ExtremeRainfall);
}

#[test]
fn test_artifact_with_foreign_layout_is_rejected() {
    let mut ensemble = TreeEnsemble::new(0.5, Vec::new());
    ensemble.feature_names.swap(0, 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flood_model.json");
    save_artifact(&ensemble, &path).unwrap();

    let predictor = RiskPredictor::from_artifact(&path);
    assert!(!predictor.has_model());

    let prediction = predictor.predict(&FeatureVector::from_values([0.0; FEATURE_COUNT]));
    assert_eq!(prediction.provenance, ModelProvenance::RuleBased);
}

#[test]
fn test_missing_artifact_means_rule_based() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = RiskPredictor::from_artifact(&dir.path().join("absent.json"));
    assert!(!predictor.has_model());
    assert_eq!(predictor.model_description(), None);
}
