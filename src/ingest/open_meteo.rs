/// Open-Meteo forecast and flood API client.
///
/// Handles URL construction and JSON response parsing for:
///   https://api.open-meteo.com/v1/forecast       (weather, soil moisture)
///   https://flood-api.open-meteo.com/v1/flood    (GloFAS river discharge)
///
/// Both endpoints are free and keyless. Requests ask for 7 past days plus 3
/// forecast days; the parsers split the hourly/daily arrays at "now" to
/// derive the trailing 24h/7d sums. See `fixtures.rs` for sample payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::model::{round_to, DischargeObservation, FetchError, WeatherObservation};

use super::ObservationSource;

pub const PAST_DAYS: u32 = 7;
pub const FORECAST_DAYS: u32 = 3;

/// Hourly entries at the end of the series that lie in the future.
const FORECAST_HOURS: usize = FORECAST_DAYS as usize * 24;

pub const WEATHER_SOURCE: &str = "Open-Meteo";
pub const FLOOD_SOURCE: &str = "Open-Meteo Flood API";

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
struct ForecastResponse {
    #[serde(default)]
    current: CurrentBlock,
    #[serde(default)]
    hourly: HourlyBlock,
    #[serde(default)]
    daily: DailyBlock,
}

#[derive(Deserialize, Default)]
struct CurrentBlock {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    precipitation: Option<f64>,
    rain: Option<f64>,
    weather_code: Option<f64>,
    wind_speed_10m: Option<f64>,
}

#[derive(Deserialize, Default)]
struct HourlyBlock {
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    soil_moisture_0_to_1cm: Vec<Option<f64>>,
}

#[derive(Deserialize, Default)]
struct DailyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct FloodResponse {
    #[serde(default)]
    daily: FloodDaily,
}

#[derive(Deserialize, Default)]
struct FloodDaily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    river_discharge: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds a forecast API URL requesting current conditions, hourly
/// precipitation + soil moisture, and daily precipitation sums.
pub fn build_forecast_url(base_url: &str, lat: f64, lon: f64, timezone: &str) -> String {
    format!(
        "{}?latitude={}&longitude={}\
         &current=temperature_2m,relative_humidity_2m,precipitation,rain,weather_code,wind_speed_10m\
         &hourly=precipitation,soil_moisture_0_to_1cm,temperature_2m\
         &daily=precipitation_sum,rain_sum\
         &timezone={}&forecast_days={}&past_days={}",
        base_url,
        lat,
        lon,
        urlencoding::encode(timezone),
        FORECAST_DAYS,
        PAST_DAYS
    )
}

/// Builds a flood API URL requesting daily river discharge.
pub fn build_flood_url(base_url: &str, lat: f64, lon: f64) -> String {
    format!(
        "{}?latitude={}&longitude={}&daily=river_discharge&past_days={}&forecast_days={}",
        base_url, lat, lon, PAST_DAYS, FORECAST_DAYS
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Sum of the non-null values in the `hours` entries that end where the
/// forecast portion of `series` begins.
fn trailing_sum(series: &[Option<f64>], hours: usize) -> f64 {
    if series.len() <= FORECAST_HOURS {
        return 0.0;
    }
    let now_idx = series.len() - FORECAST_HOURS;
    let start = now_idx.saturating_sub(hours);
    series[start..now_idx].iter().flatten().sum()
}

/// Parses a forecast API response into a `WeatherObservation`.
///
/// Rainfall sums are rounded to 0.1 mm and soil moisture to 4 decimals.
/// Current-condition fields missing from the response stay `None`.
///
/// # Errors
/// `FetchError::ParseError` when the body is not a JSON object of the
/// expected shape.
pub fn parse_forecast_response(
    json: &str,
    lat: f64,
    lon: f64,
    now: DateTime<Utc>,
) -> Result<WeatherObservation, FetchError> {
    let response: ForecastResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::ParseError(format!("forecast JSON deserialization failed: {}", e)))?;

    let precipitation = &response.hourly.precipitation;
    let rainfall_24h = trailing_sum(precipitation, 24);
    let rainfall_7d = trailing_sum(precipitation, 24 * PAST_DAYS as usize);

    let soil_moisture = response
        .hourly
        .soil_moisture_0_to_1cm
        .iter()
        .rev()
        .find_map(|v| *v)
        .unwrap_or(0.0);

    let current = response.current;

    Ok(WeatherObservation {
        lat: Some(lat),
        lon: Some(lon),
        temperature: current.temperature_2m,
        humidity: current.relative_humidity_2m,
        current_precipitation: current.precipitation,
        current_rain: current.rain,
        wind_speed: current.wind_speed_10m,
        weather_code: current.weather_code.map(|c| c as i64),
        rainfall_24h: Some(round_to(rainfall_24h, 1)),
        rainfall_7d: Some(round_to(rainfall_7d, 1)),
        soil_moisture: Some(round_to(soil_moisture, 4)),
        daily_precipitation: response.daily.precipitation_sum,
        daily_dates: response.daily.time,
        source: Some(WEATHER_SOURCE.to_string()),
        timestamp: Some(now.to_rfc3339()),
    })
}

/// Parses a flood API response into a `DischargeObservation`.
///
/// Current discharge is the last non-null daily value; max and mean are over
/// all non-null values (mean rounded to 2 decimals). A series with no values
/// yields zeros.
pub fn parse_flood_response(json: &str, lat: f64, lon: f64) -> Result<DischargeObservation, FetchError> {
    let response: FloodResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::ParseError(format!("flood JSON deserialization failed: {}", e)))?;

    let valid: Vec<f64> = response.daily.river_discharge.iter().flatten().copied().collect();

    let (current, max, avg) = match valid.last() {
        Some(last) => {
            let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = valid.iter().sum::<f64>() / valid.len() as f64;
            (*last, max, round_to(avg, 2))
        }
        None => (0.0, 0.0, 0.0),
    };

    Ok(DischargeObservation {
        lat: Some(lat),
        lon: Some(lon),
        current_discharge: Some(current),
        max_discharge_7d: Some(max),
        avg_discharge_7d: Some(avg),
        discharge_trend: response.daily.river_discharge,
        dates: response.daily.time,
        source: Some(FLOOD_SOURCE.to_string()),
        error: None,
    })
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking Open-Meteo client with a bounded per-request timeout.
pub struct OpenMeteoClient {
    http: reqwest::blocking::Client,
    forecast_base_url: String,
    flood_base_url: String,
    timezone: String,
}

impl OpenMeteoClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            forecast_base_url: config.forecast_base_url.clone(),
            flood_base_url: config.flood_base_url.clone(),
            timezone: config.timezone.clone(),
        })
    }

    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        log::debug!("Fetching: {}", url);

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| request_error(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::HttpError(response.status().as_u16()));
        }

        response.text().map_err(|e| request_error(url, e))
    }

    fn fetch_discharge(&self, lat: f64, lon: f64) -> Result<DischargeObservation, FetchError> {
        let url = build_flood_url(&self.flood_base_url, lat, lon);
        let body = self.get_text(&url)?;
        parse_flood_response(&body, lat, lon)
    }
}

fn request_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}

impl ObservationSource for OpenMeteoClient {
    fn weather(&self, lat: f64, lon: f64) -> Result<WeatherObservation, FetchError> {
        let url = build_forecast_url(&self.forecast_base_url, lat, lon, &self.timezone);
        let body = self.get_text(&url)?;
        parse_forecast_response(&body, lat, lon, Utc::now())
    }

    fn discharge(&self, lat: f64, lon: f64) -> DischargeObservation {
        match self.fetch_discharge(lat, lon) {
            Ok(obs) => obs,
            Err(e) => {
                log::warn!("Discharge unavailable for ({}, {}): {}", lat, lon, e);
                DischargeObservation::unavailable(lat, lon, e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
