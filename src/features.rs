/// Feature vector construction and the feature layout contract.
///
/// The trained model and the rule-based scorer both consume a fixed-order,
/// fixed-length vector of ten values. `FEATURE_LAYOUT` is the single source
/// of truth for that order; the offline trainer stamps `layout_hash()` into
/// every artifact it writes and the predictor refuses artifacts stamped with
/// a different hash.
///
/// Rules for changing the layout:
/// 1. Adding, removing or reordering a feature bumps `FEATURE_SCHEMA_VERSION`.
/// 2. Every trained artifact must be regenerated afterwards.

use crc32fast::Hasher;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::model::{DischargeObservation, WeatherObservation};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

pub const FEATURE_SCHEMA_VERSION: u8 = 1;

pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    "rainfall_24h",     // 0: mm in past 24 hours
    "rainfall_7d",      // 1: mm in past 7 days
    "soil_moisture",    // 2: fraction 0-1
    "river_discharge",  // 3: m³/s, current
    "max_discharge_7d", // 4: m³/s, max over 7 days
    "avg_discharge_7d", // 5: m³/s, average over 7 days
    "humidity",         // 6: %
    "temperature",      // 7: °C
    "wind_speed",       // 8: km/h
    "weather_code",     // 9: WMO code
];

pub const FEATURE_COUNT: usize = 10;

pub const IDX_RAINFALL_24H: usize = 0;
pub const IDX_RAINFALL_7D: usize = 1;
pub const IDX_SOIL_MOISTURE: usize = 2;
pub const IDX_RIVER_DISCHARGE: usize = 3;

/// Substituted when the observation has no humidity reading.
pub const DEFAULT_HUMIDITY: f64 = 50.0;
/// Substituted when the observation has no temperature reading.
pub const DEFAULT_TEMPERATURE: f64 = 25.0;

/// CRC32 over the schema version and the feature names in order.
pub fn layout_hash() -> u32 {
    layout_hash_of(&FEATURE_LAYOUT)
}

/// Same hash for an arbitrary list of names, used to check artifacts.
pub fn layout_hash_of<S: AsRef<str>>(names: &[S]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_SCHEMA_VERSION]);
    for name in names {
        hasher.update(name.as_ref().as_bytes());
        // separator so ["ab","c"] and ["a","bc"] hash differently
        hasher.update(&[0]);
    }
    hasher.finalize()
}

// ---------------------------------------------------------------------------
// Feature vector
// ---------------------------------------------------------------------------

/// Ordered feature values, indexed by `FEATURE_LAYOUT`.
///
/// Serializes as a JSON object whose keys appear in layout order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        FeatureVector(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Value of a named feature, `None` for names not in the layout.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_LAYOUT
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }

    pub fn rainfall_24h(&self) -> f64 {
        self.0[IDX_RAINFALL_24H]
    }

    pub fn rainfall_7d(&self) -> f64 {
        self.0[IDX_RAINFALL_7D]
    }

    pub fn soil_moisture(&self) -> f64 {
        self.0[IDX_SOIL_MOISTURE]
    }

    pub fn river_discharge(&self) -> f64 {
        self.0[IDX_RIVER_DISCHARGE]
    }

    /// (name, value) pairs in layout order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_LAYOUT.iter().copied().zip(self.0.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.named() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Builds the feature vector from a weather and a discharge observation.
///
/// Absent fields take their documented defaults: 50 for humidity, 25 for
/// temperature, 0 for everything else. Values are not range-checked.
pub fn build_features(weather: &WeatherObservation, discharge: &DischargeObservation) -> FeatureVector {
    FeatureVector([
        weather.rainfall_24h(),
        weather.rainfall_7d(),
        weather.soil_moisture(),
        discharge.current_discharge.unwrap_or(0.0),
        discharge.max_discharge_7d.unwrap_or(0.0),
        discharge.avg_discharge_7d.unwrap_or(0.0),
        weather.humidity.unwrap_or(DEFAULT_HUMIDITY),
        weather.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        weather.wind_speed.unwrap_or(0.0),
        weather.weather_code() as f64,
    ])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_length_matches_count() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_LAYOUT[IDX_RAINFALL_24H], "rainfall_24h");
        assert_eq!(FEATURE_LAYOUT[IDX_RIVER_DISCHARGE], "river_discharge");
        assert_eq!(FEATURE_LAYOUT[9], "weather_code");
    }

    #[test]
    fn test_layout_hash_detects_reordering() {
        let mut swapped = FEATURE_LAYOUT;
        swapped.swap(0, 1);
        assert_ne!(layout_hash(), layout_hash_of(&swapped));
        assert_eq!(layout_hash(), layout_hash_of(&FEATURE_LAYOUT.to_vec()));
    }

    #[test]
    fn test_layout_hash_detects_truncation() {
        assert_ne!(layout_hash(), layout_hash_of(&FEATURE_LAYOUT[..9]));
    }

    #[test]
    fn test_build_features_defaults() {
        let fv = build_features(&WeatherObservation::default(), &DischargeObservation::default());
        assert_eq!(
            fv.values(),
            &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.0, 25.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_build_features_order() {
        let weather = WeatherObservation {
            rainfall_24h: Some(1.0),
            rainfall_7d: Some(2.0),
            soil_moisture: Some(0.3),
            humidity: Some(7.0),
            temperature: Some(8.0),
            wind_speed: Some(9.0),
            weather_code: Some(10),
            ..Default::default()
        };
        let discharge = DischargeObservation {
            current_discharge: Some(4.0),
            max_discharge_7d: Some(5.0),
            avg_discharge_7d: Some(6.0),
            ..Default::default()
        };
        let fv = build_features(&weather, &discharge);
        assert_eq!(fv.values(), &[1.0, 2.0, 0.3, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(fv.get("max_discharge_7d"), Some(5.0));
        assert_eq!(fv.get("not_a_feature"), None);
    }

    #[test]
    fn test_build_features_passes_out_of_range_values_through() {
        let weather = WeatherObservation {
            rainfall_24h: Some(-5.0),
            soil_moisture: Some(1.7),
            ..Default::default()
        };
        let fv = build_features(&weather, &DischargeObservation::default());
        assert_eq!(fv.rainfall_24h(), -5.0);
        assert_eq!(fv.soil_moisture(), 1.7);
    }

    #[test]
    fn test_serializes_in_layout_order() {
        let fv = build_features(&WeatherObservation::default(), &DischargeObservation::default());
        let json = serde_json::to_string(&fv).unwrap();
        let positions: Vec<usize> = FEATURE_LAYOUT
            .iter()
            .map(|name| json.find(&format!("\"{}\"", name)).expect("every feature serialized"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "keys out of order: {}", json);
    }
}
