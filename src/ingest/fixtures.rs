/// Test fixtures: representative JSON payloads from the Open-Meteo APIs.
///
/// Forecast response shape (past_days=7, forecast_days=3):
///   current.{temperature_2m, relative_humidity_2m, precipitation, rain,
///            weather_code, wind_speed_10m}
///   hourly.time[]                    - 240 entries, oldest first
///   hourly.precipitation[]           - mm per hour, may contain nulls
///   hourly.soil_moisture_0_to_1cm[]  - m³/m³, trailing nulls are common
///   daily.time[] / daily.precipitation_sum[] - 10 entries
///
/// Flood response shape:
///   daily.time[] / daily.river_discharge[]  - m³/s, may contain nulls
///
/// The last 72 hourly entries are forecast, not observation. Parsers must
/// not count them toward past rainfall.

#[cfg(test)]
use serde_json::json;

/// Full 10-day forecast payload for Guwahati.
///
/// Hourly precipitation: hours 0–143 at 1.0 mm, hours 144–167 at 2.0 mm
/// with hour 150 null, forecast hours 168–239 at 9.0 mm. So the trailing
/// 24h sum is 46.0 mm and the trailing 7d sum is 190.0 mm.
/// Soil moisture: last non-null value is 0.4215 at hour 234.
#[cfg(test)]
pub(crate) fn fixture_forecast_json() -> String {
    let precipitation: Vec<serde_json::Value> = (0..240)
        .map(|hour| match hour {
            150 => serde_json::Value::Null,
            0..=143 => json!(1.0),
            144..=167 => json!(2.0),
            _ => json!(9.0),
        })
        .collect();

    let soil: Vec<serde_json::Value> = (0..240)
        .map(|hour| match hour {
            235..=239 => serde_json::Value::Null,
            234 => json!(0.4215),
            _ => json!(0.3),
        })
        .collect();

    let times: Vec<String> = (0..240)
        .map(|hour| format!("2024-07-{:02}T{:02}:00", 8 + hour / 24, hour % 24))
        .collect();

    let days: Vec<String> = (0..10).map(|d| format!("2024-07-{:02}", 8 + d)).collect();

    json!({
        "latitude": 26.125,
        "longitude": 91.75,
        "timezone": "Asia/Kolkata",
        "current": {
            "time": "2024-07-15T14:30",
            "temperature_2m": 29.4,
            "relative_humidity_2m": 88,
            "precipitation": 1.2,
            "rain": 1.1,
            "weather_code": 63,
            "wind_speed_10m": 14.2
        },
        "hourly": {
            "time": times,
            "precipitation": precipitation,
            "soil_moisture_0_to_1cm": soil,
            "temperature_2m": vec![27.5; 240]
        },
        "daily": {
            "time": days,
            "precipitation_sum": [24.0, 24.0, 24.0, 24.0, 24.0, 24.0, 46.0, 216.0, 216.0, 216.0],
            "rain_sum": [24.0, 24.0, 24.0, 24.0, 24.0, 24.0, 46.0, 216.0, 216.0, 216.0]
        }
    })
    .to_string()
}

/// Truncated payload with fewer hourly entries than the forecast window and
/// no `current` block, as returned for some ocean grid cells.
#[cfg(test)]
pub(crate) fn fixture_forecast_short_json() -> &'static str {
    r#"{
      "latitude": 1.0,
      "longitude": 2.0,
      "hourly": {
        "time": ["2024-07-15T00:00", "2024-07-15T01:00", "2024-07-15T02:00"],
        "precipitation": [0.5, 0.2, null],
        "soil_moisture_0_to_1cm": [null, null, null]
      },
      "daily": { "time": [], "precipitation_sum": [] }
    }"#
}

/// Brahmaputra discharge with one missing day.
/// Non-null values: last 1450.0, max 1600.0, mean 1450.0833…
#[cfg(test)]
pub(crate) fn fixture_flood_json() -> &'static str {
    r#"{
      "latitude": 26.125,
      "longitude": 91.75,
      "daily_units": { "time": "iso8601", "river_discharge": "m³/s" },
      "daily": {
        "time": ["2024-07-08", "2024-07-09", "2024-07-10", "2024-07-11", "2024-07-12",
                 "2024-07-13", "2024-07-14", "2024-07-15", "2024-07-16", "2024-07-17"],
        "river_discharge": [1200.5, null, 1350.0, 1410.25, 1600.0, 1580.0, 1500.0, 1490.0, 1470.0, 1450.0]
      }
    }"#
}

/// Observation pair in the service's own JSON shape, as accepted by
/// `POST /assess`. Matches the severe end-to-end scenario.
#[cfg(test)]
pub(crate) fn fixture_assess_request_json() -> &'static str {
    r#"{
      "weather": {
        "lat": 26.14, "lon": 91.74,
        "rainfall_24h": 250, "rainfall_7d": 600, "soil_moisture": 0.9,
        "humidity": 90, "temperature": 30, "wind_speed": 10, "weather_code": 65
      },
      "discharge": {
        "current_discharge": 6000, "max_discharge_7d": 6500, "avg_discharge_7d": 5200
      }
    }"#
}
