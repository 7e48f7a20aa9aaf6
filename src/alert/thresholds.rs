//! Alert derivation from current weather observations.
//!
//! Four independent rule families are evaluated against the rainfall, soil
//! moisture and weather-code fields; none overrides another. When none of
//! them fires, a single all-clear record is produced, so the result is never
//! empty.
//!
//! | Family             | Condition          | Type                 | Severity |
//! |--------------------|--------------------|----------------------|----------|
//! | Rainfall (24h)     | > 100 mm           | EXTREME_RAINFALL     | SEVERE   |
//! |                    | > 50 mm            | HEAVY_RAINFALL       | HIGH     |
//! |                    | > 20 mm            | MODERATE_RAINFALL    | MODERATE |
//! | Soil saturation    | > 80 %             | SOIL_SATURATION      | HIGH     |
//! | Rainfall (7d)      | > 300 mm           | CUMULATIVE_RAINFALL  | SEVERE   |
//! | Weather code       | >= 95              | THUNDERSTORM         | HIGH     |
//!
//! Alerts are not deduplicated here. Their ids are `<prefix>-<YYYYMMDDHH>`
//! in UTC, which gives downstream storage a natural key within one hour.
//!
//! # Clock injection
//! `derive_alerts_at` takes `now` explicitly; `derive_alerts` is the
//! wall-clock wrapper.

use chrono::{DateTime, Utc};

use crate::model::{Alert, AlertType, RiskLevel, WeatherObservation};

use super::weather_codes::{self, THUNDERSTORM_MIN_CODE};

pub const ANALYSIS_SOURCE: &str = "FloodSense AI Analysis";
pub const WEATHER_SOURCE: &str = "Open-Meteo Weather";

pub const EXTREME_RAINFALL_MM: f64 = 100.0;
pub const HEAVY_RAINFALL_MM: f64 = 50.0;
pub const MODERATE_RAINFALL_MM: f64 = 20.0;
pub const SOIL_SATURATION_FRACTION: f64 = 0.8;
pub const CUMULATIVE_RAINFALL_MM: f64 = 300.0;

/// `<prefix>-<YYYYMMDDHH>` for the hour containing `now`.
pub fn alert_id(alert_type: AlertType, now: DateTime<Utc>) -> String {
    format!("{}-{}", alert_type.id_prefix(), now.format("%Y%m%d%H"))
}

/// Fields shared by every alert built in one derivation pass.
struct AlertContext {
    lat: f64,
    lon: f64,
    now: DateTime<Utc>,
}

impl AlertContext {
    fn build(
        &self,
        alert_type: AlertType,
        severity: RiskLevel,
        title: &str,
        message: String,
        recommendation: &str,
        source: &str,
    ) -> Alert {
        Alert {
            id: alert_id(alert_type, self.now),
            alert_type,
            severity,
            title: title.to_string(),
            message,
            recommendation: recommendation.to_string(),
            lat: self.lat,
            lon: self.lon,
            source: source.to_string(),
            timestamp: self.now,
        }
    }
}

/// Derives alerts for `weather` as of `now`.
pub fn derive_alerts_at(weather: &WeatherObservation, now: DateTime<Utc>) -> Vec<Alert> {
    let rainfall_24h = weather.rainfall_24h();
    let rainfall_7d = weather.rainfall_7d();
    let soil_moisture = weather.soil_moisture();
    let weather_code = weather.weather_code();

    let ctx = AlertContext { lat: weather.lat(), lon: weather.lon(), now };
    let mut alerts = Vec::new();

    // Rainfall intensity: highest band only
    if rainfall_24h > EXTREME_RAINFALL_MM {
        alerts.push(ctx.build(
            AlertType::ExtremeRainfall,
            RiskLevel::Severe,
            "Extreme Rainfall Warning",
            format!(
                "Extremely heavy rainfall of {:?}mm recorded in past 24 hours. Flash flood risk is very high.",
                rainfall_24h
            ),
            "Evacuate low-lying areas immediately. Move to higher ground.",
            ANALYSIS_SOURCE,
        ));
    } else if rainfall_24h > HEAVY_RAINFALL_MM {
        alerts.push(ctx.build(
            AlertType::HeavyRainfall,
            RiskLevel::High,
            "Heavy Rainfall Alert",
            format!("Heavy rainfall of {:?}mm in past 24 hours. Flood risk elevated.", rainfall_24h),
            "Avoid waterlogged areas. Keep emergency supplies ready.",
            ANALYSIS_SOURCE,
        ));
    } else if rainfall_24h > MODERATE_RAINFALL_MM {
        alerts.push(ctx.build(
            AlertType::ModerateRainfall,
            RiskLevel::Moderate,
            "Rainfall Advisory",
            format!("Moderate rainfall of {:?}mm in past 24 hours.", rainfall_24h),
            "Stay alert. Monitor local water levels.",
            ANALYSIS_SOURCE,
        ));
    }

    if soil_moisture > SOIL_SATURATION_FRACTION {
        alerts.push(ctx.build(
            AlertType::SoilSaturation,
            RiskLevel::High,
            "Soil Saturation Warning",
            format!(
                "Soil moisture at {:.0}%. Ground cannot absorb more water, high runoff expected.",
                soil_moisture * 100.0
            ),
            "Risk of landslides in hilly areas. Avoid slopes.",
            ANALYSIS_SOURCE,
        ));
    }

    if rainfall_7d > CUMULATIVE_RAINFALL_MM {
        alerts.push(ctx.build(
            AlertType::CumulativeRainfall,
            RiskLevel::Severe,
            "Prolonged Flooding Risk",
            format!(
                "Total {:?}mm rainfall over 7 days. Rivers and reservoirs likely at capacity.",
                rainfall_7d
            ),
            "Be prepared for sustained flooding. Follow NDMA guidelines.",
            ANALYSIS_SOURCE,
        ));
    }

    if weather_code >= THUNDERSTORM_MIN_CODE {
        alerts.push(ctx.build(
            AlertType::Thunderstorm,
            RiskLevel::High,
            "Severe Thunderstorm",
            format!(
                "Active thunderstorm detected. {}.",
                weather_codes::describe(weather_code).unwrap_or("Severe weather")
            ),
            "Stay indoors. Avoid open areas and water bodies.",
            WEATHER_SOURCE,
        ));
    }

    if alerts.is_empty() {
        alerts.push(ctx.build(
            AlertType::AllClear,
            RiskLevel::Low,
            "No Active Warnings",
            format!(
                "Current conditions normal. Rainfall: {:?}mm/24h. Weather: {}.",
                rainfall_24h,
                weather_codes::describe(weather_code).unwrap_or("Unknown")
            ),
            "No action needed. Continue to monitor.",
            ANALYSIS_SOURCE,
        ));
    }

    alerts
}

/// Convenience wrapper that uses the real current time.
/// Use `derive_alerts_at` in tests to keep them deterministic.
pub fn derive_alerts(weather: &WeatherObservation) -> Vec<Alert> {
    derive_alerts_at(weather, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
