/// Core data types for the flood risk assessment service.
///
/// This module defines the shared domain model imported by all other modules:
/// the observation records handed to us by upstream data sources, the risk
/// assessment and alert records we hand back, and the error types. It holds
/// no scoring logic and performs no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// Current and recent weather conditions at a point.
///
/// Every measurement is optional. A missing or unreadable field is `None`
/// and the scoring code substitutes the documented default for it, so no
/// single field can make a record unusable. Field names match the JSON the
/// service exchanges (`lat`/`lon`, `rainfall_24h`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    #[serde(default, deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lon: Option<f64>,
    /// Air temperature, °C.
    #[serde(default, deserialize_with = "lenient::number")]
    pub temperature: Option<f64>,
    /// Relative humidity, %.
    #[serde(default, deserialize_with = "lenient::number")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub current_precipitation: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub current_rain: Option<f64>,
    /// Wind speed at 10 m, km/h.
    #[serde(default, deserialize_with = "lenient::number")]
    pub wind_speed: Option<f64>,
    /// WMO weather interpretation code.
    #[serde(default, deserialize_with = "lenient::code")]
    pub weather_code: Option<i64>,
    /// Accumulated rainfall over the past 24 hours, mm.
    #[serde(default, deserialize_with = "lenient::number")]
    pub rainfall_24h: Option<f64>,
    /// Accumulated rainfall over the past 7 days, mm.
    #[serde(default, deserialize_with = "lenient::number")]
    pub rainfall_7d: Option<f64>,
    /// Volumetric soil moisture of the top layer, fraction 0–1.
    #[serde(default, deserialize_with = "lenient::number")]
    pub soil_moisture: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number_list")]
    pub daily_precipitation: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub daily_dates: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub timestamp: Option<String>,
}

impl WeatherObservation {
    pub fn rainfall_24h(&self) -> f64 {
        self.rainfall_24h.unwrap_or(0.0)
    }

    pub fn rainfall_7d(&self) -> f64 {
        self.rainfall_7d.unwrap_or(0.0)
    }

    pub fn soil_moisture(&self) -> f64 {
        self.soil_moisture.unwrap_or(0.0)
    }

    pub fn weather_code(&self) -> i64 {
        self.weather_code.unwrap_or(0)
    }

    pub fn lat(&self) -> f64 {
        self.lat.unwrap_or(0.0)
    }

    pub fn lon(&self) -> f64 {
        self.lon.unwrap_or(0.0)
    }
}

/// River discharge near a point, in m³/s.
///
/// When the flood API cannot be reached the discharge source degrades to
/// [`DischargeObservation::unavailable`] instead of failing the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DischargeObservation {
    #[serde(default, deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub current_discharge: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_discharge_7d: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub avg_discharge_7d: Option<f64>,
    /// Raw daily series as returned upstream, gaps preserved as `None`.
    #[serde(default, deserialize_with = "lenient::number_list")]
    pub discharge_trend: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub dates: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text")]
    pub error: Option<String>,
}

/// Source tag carried by a discharge record that could not be fetched.
pub const SOURCE_UNAVAILABLE: &str = "unavailable";

impl DischargeObservation {
    /// Zero-filled record returned when the discharge provider fails.
    pub fn unavailable(lat: f64, lon: f64, error: impl Into<String>) -> Self {
        DischargeObservation {
            lat: Some(lat),
            lon: Some(lon),
            current_discharge: Some(0.0),
            max_discharge_7d: Some(0.0),
            avg_discharge_7d: Some(0.0),
            discharge_trend: Vec::new(),
            dates: Vec::new(),
            source: Some(SOURCE_UNAVAILABLE.to_string()),
            error: Some(error.into()),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.source.as_deref() == Some(SOURCE_UNAVAILABLE)
    }
}

// ---------------------------------------------------------------------------
// Risk types
// ---------------------------------------------------------------------------

/// Discrete risk / alert severity, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Severe,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Moderate => write!(f, "MODERATE"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Severe => write!(f, "SEVERE"),
        }
    }
}

/// Which scoring path produced a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelProvenance {
    #[serde(rename = "trained")]
    Trained,
    #[serde(rename = "rule-based")]
    RuleBased,
}

impl std::fmt::Display for ModelProvenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelProvenance::Trained => write!(f, "trained"),
            ModelProvenance::RuleBased => write!(f, "rule-based"),
        }
    }
}

/// One explainability entry: why the score came out the way it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
    pub factor: String,
    pub value: String,
    pub impact: RiskLevel,
}

/// Flood risk assessment for one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// Probability in [0, 1], rounded to 3 decimals.
    pub probability: f64,
    /// probability × 10, rounded to 1 decimal.
    pub risk_score: f64,
    pub contributing_factors: Vec<ContributingFactor>,
    pub recommendation: String,
    pub model: ModelProvenance,
    /// The exact feature values the score was computed from.
    pub features_used: FeatureVector,
}

// ---------------------------------------------------------------------------
// Alert types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    ExtremeRainfall,
    HeavyRainfall,
    ModerateRainfall,
    SoilSaturation,
    CumulativeRainfall,
    Thunderstorm,
    AllClear,
}

impl AlertType {
    /// Prefix of the alert id. The three rainfall bands share one prefix,
    /// so at most one rainfall alert exists per hour.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            AlertType::ExtremeRainfall | AlertType::HeavyRainfall | AlertType::ModerateRainfall => {
                "RAIN"
            }
            AlertType::SoilSaturation => "SOIL",
            AlertType::CumulativeRainfall => "CUM",
            AlertType::Thunderstorm => "STORM",
            AlertType::AllClear => "OK",
        }
    }
}

/// A human-readable alert derived from current observations.
///
/// `id` is `<prefix>-<YYYYMMDDHH>`, so two alerts of the same type created
/// within the same UTC hour share an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: RiskLevel,
    pub title: String,
    pub message: String,
    pub recommendation: String,
    pub lat: f64,
    pub lon: f64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while loading or evaluating a trained model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No artifact exists at the configured path.
    NotFound(String),
    /// The artifact exists but could not be read.
    Io(String),
    /// The artifact could not be deserialized.
    Parse(String),
    /// The artifact was trained against a different feature layout.
    SchemaMismatch { expected: String, found: String },
    /// The model failed while scoring a single feature vector.
    Inference(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::NotFound(path) => write!(f, "Model artifact not found: {}", path),
            ModelError::Io(msg) => write!(f, "Model I/O error: {}", msg),
            ModelError::Parse(msg) => write!(f, "Model parse error: {}", msg),
            ModelError::SchemaMismatch { expected, found } => {
                write!(f, "Feature schema mismatch: expected {}, found {}", expected, found)
            }
            ModelError::Inference(msg) => write!(f, "Model inference failed: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Errors that can arise when fetching observations from upstream providers.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    Timeout(String),
    /// Non-2xx HTTP response.
    HttpError(u16),
    /// Connection-level failure (DNS, TLS, refused, ...).
    Network(String),
    /// The response body could not be deserialized.
    ParseError(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Timeout(url) => write!(f, "Request timed out: {}", url),
            FetchError::HttpError(code) => write!(f, "HTTP error: {}", code),
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Half-away-from-zero rounding to `decimals` places, used for every
/// user-facing number (probabilities, rainfall sums, discharge means).
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Lenient field deserialization
// ---------------------------------------------------------------------------

/// Field deserializers that never fail. Numbers and numeric strings are
/// accepted; anything else (including non-finite values) becomes absent.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_number(value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite())
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(as_number(&value))
    }

    pub fn code<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(as_number(&value).map(|v| v.trunc() as i64))
    }

    pub fn number_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<f64>>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Array(items) => items.iter().map(as_number).collect(),
            _ => Vec::new(),
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    pub fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(4.56, 1), 4.6);
        assert_eq!(round_to(1.0, 3), 1.0);
        assert_eq!(round_to(1450.083333, 2), 1450.08);
    }

    #[test]
    fn test_weather_observation_missing_fields_are_absent() {
        let obs: WeatherObservation = serde_json::from_str(r#"{ "rainfall_24h": 12.5 }"#)
            .expect("partial record should deserialize");
        assert_eq!(obs.rainfall_24h, Some(12.5));
        assert_eq!(obs.humidity, None);
        assert_eq!(obs.weather_code, None);
        assert!(obs.daily_precipitation.is_empty());
    }

    #[test]
    fn test_weather_observation_tolerates_malformed_fields() {
        let obs: WeatherObservation = serde_json::from_str(
            r#"{
                "rainfall_24h": "55.2",
                "rainfall_7d": "lots",
                "soil_moisture": null,
                "humidity": [1, 2],
                "weather_code": 95.0,
                "daily_precipitation": [1.0, null, "x", 3],
                "source": 7
            }"#,
        )
        .expect("malformed fields must not fail the record");

        assert_eq!(obs.rainfall_24h, Some(55.2));
        assert_eq!(obs.rainfall_7d, None);
        assert_eq!(obs.soil_moisture, None);
        assert_eq!(obs.humidity, None);
        assert_eq!(obs.weather_code, Some(95));
        assert_eq!(obs.daily_precipitation, vec![Some(1.0), None, None, Some(3.0)]);
        assert_eq!(obs.source.as_deref(), Some("7"));
    }

    #[test]
    fn test_weather_accessors_apply_zero_defaults() {
        let obs = WeatherObservation::default();
        assert_eq!(obs.rainfall_24h(), 0.0);
        assert_eq!(obs.rainfall_7d(), 0.0);
        assert_eq!(obs.soil_moisture(), 0.0);
        assert_eq!(obs.weather_code(), 0);
        assert_eq!(obs.lat(), 0.0);
    }

    #[test]
    fn test_unavailable_discharge_is_zero_filled() {
        let obs = DischargeObservation::unavailable(26.1, 91.7, "connection refused");
        assert!(obs.is_unavailable());
        assert_eq!(obs.current_discharge, Some(0.0));
        assert_eq!(obs.max_discharge_7d, Some(0.0));
        assert_eq!(obs.avg_discharge_7d, Some(0.0));
        assert!(obs.discharge_trend.is_empty());
        assert_eq!(obs.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Severe);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&RiskLevel::Severe).unwrap(), "\"SEVERE\"");
        assert_eq!(serde_json::to_string(&ModelProvenance::RuleBased).unwrap(), "\"rule-based\"");
        assert_eq!(serde_json::to_string(&ModelProvenance::Trained).unwrap(), "\"trained\"");
        assert_eq!(
            serde_json::to_string(&AlertType::ExtremeRainfall).unwrap(),
            "\"EXTREME_RAINFALL\""
        );
        assert_eq!(serde_json::to_string(&AlertType::AllClear).unwrap(), "\"ALL_CLEAR\"");
    }

    #[test]
    fn test_rainfall_alert_types_share_id_prefix() {
        assert_eq!(AlertType::ExtremeRainfall.id_prefix(), "RAIN");
        assert_eq!(AlertType::HeavyRainfall.id_prefix(), "RAIN");
        assert_eq!(AlertType::ModerateRainfall.id_prefix(), "RAIN");
        assert_eq!(AlertType::AllClear.id_prefix(), "OK");
    }

    #[test]
    fn test_error_display_messages() {
        assert_eq!(FetchError::HttpError(503).to_string(), "HTTP error: 503");
        let err = ModelError::SchemaMismatch {
            expected: "10 features".to_string(),
            found: "9 features".to_string(),
        };
        assert!(err.to_string().contains("expected 10 features"));
    }
}
