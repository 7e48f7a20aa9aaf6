/// floodrisk_service: flood risk scoring for arbitrary coordinates.
///
/// # Module structure
///
/// ```text
/// floodrisk_service
/// ├── model       shared data types (WeatherObservation, RiskAssessment, Alert, errors)
/// ├── features    fixed 10-feature layout, defaults and layout hash
/// ├── config      service configuration loader (floodrisk.toml + env overrides)
/// ├── risk
/// │   ├── rules     rule-based additive scorer
/// │   ├── classify  probability → level, recommendation, contributing factors
/// │   ├── artifact  tree ensemble artifact format, load/save, schema guard
/// │   └── predictor trained model with per-call rule-based fallback
/// ├── alert
/// │   ├── thresholds    rainfall / soil / cumulative / thunderstorm alert rules
/// │   └── weather_codes WMO weather code descriptions
/// ├── ingest
/// │   ├── open_meteo  Open-Meteo forecast + flood API: URLs, parsing, client
/// │   └── fixtures (test only) representative API response payloads
/// ├── service     concurrent fetch + assessment + alerts for one location
/// ├── endpoint    HTTP API (tiny_http)
/// └── training    synthetic data and gradient-boosted tree trainer
/// ```

/// Public modules
pub mod alert;
pub mod config;
pub mod endpoint;
pub mod features;
pub mod ingest;
pub mod model;
pub mod risk;
pub mod service;
pub mod training;
