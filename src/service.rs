/// Assessment service: ties an observation source to the risk predictor and
/// the alert rules.
///
/// Weather and discharge for a location are fetched concurrently on a small
/// worker pool. A weather failure fails the report; a discharge failure only
/// degrades it (the source substitutes an "unavailable" record).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::mpsc;
use threadpool::ThreadPool;

use crate::alert::derive_alerts_at;
use crate::config::ServiceConfig;
use crate::ingest::ObservationSource;
use crate::ingest::open_meteo::OpenMeteoClient;
use crate::model::{Alert, DischargeObservation, FetchError, RiskAssessment, RiskLevel, WeatherObservation};
use crate::risk::RiskPredictor;

/// Everything known about one location at one moment.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub latitude: f64,
    pub longitude: f64,
    pub risk: RiskAssessment,
    pub alerts: Vec<Alert>,
    pub weather: WeatherObservation,
    pub discharge: DischargeObservation,
    pub generated_at: DateTime<Utc>,
}

/// Largest batch accepted by `POST /predict/bulk`.
pub const MAX_BULK_LOCATIONS: usize = 100;

/// One point in a bulk request. Place names are echoed back untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BulkLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, alias = "district_name")]
    pub district: Option<String>,
    #[serde(default, alias = "state_name")]
    pub state: Option<String>,
}

/// Condensed per-point result for map views. On failure only the location
/// and `error` are filled in; the rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkRiskResult {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub risk_score: Option<f64>,
    pub probability: Option<f64>,
    pub rainfall_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkRiskResult {
    fn failed(location: &BulkLocation, error: String) -> Self {
        BulkRiskResult {
            lat: location.lat,
            lon: location.lon,
            district: location.district.clone(),
            state: location.state.clone(),
            risk_level: None,
            risk_score: None,
            probability: None,
            rainfall_24h: None,
            error: Some(error),
        }
    }
}

/// Rejects non-finite or out-of-range coordinates.
pub fn check_coordinates(lat: f64, lon: f64) -> Result<(), String> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude must be within [-90, 90], got {}", lat));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude must be within [-180, 180], got {}", lon));
    }
    Ok(())
}

enum Fetched {
    Weather(Result<WeatherObservation, FetchError>),
    Discharge(DischargeObservation),
}

pub struct FloodService {
    predictor: RiskPredictor,
    source: Arc<dyn ObservationSource>,
    pool: ThreadPool,
}

impl FloodService {
    pub fn new(predictor: RiskPredictor, source: Arc<dyn ObservationSource>, fetch_threads: usize) -> Self {
        Self {
            predictor,
            source,
            pool: ThreadPool::with_name("observation-fetch".to_string(), fetch_threads.max(1)),
        }
    }

    /// Builds the production service: Open-Meteo upstream plus whatever
    /// model artifact the config points at (rules if none loads).
    pub fn from_config(config: &ServiceConfig) -> Result<Self, FetchError> {
        let client = OpenMeteoClient::new(&config.upstream)?;
        let predictor = RiskPredictor::from_artifact(&config.model.artifact_path);
        Ok(Self::new(predictor, Arc::new(client), config.workers.fetch_threads))
    }

    pub fn predictor(&self) -> &RiskPredictor {
        &self.predictor
    }

    /// Scores an observation pair supplied by the caller. No upstream calls.
    pub fn assess(&self, weather: &WeatherObservation, discharge: &DischargeObservation) -> RiskAssessment {
        self.predictor.assess(weather, discharge)
    }

    pub fn weather(&self, lat: f64, lon: f64) -> Result<WeatherObservation, FetchError> {
        self.source.weather(lat, lon)
    }

    pub fn discharge(&self, lat: f64, lon: f64) -> DischargeObservation {
        self.source.discharge(lat, lon)
    }

    pub fn alerts(&self, lat: f64, lon: f64) -> Result<Vec<Alert>, FetchError> {
        let weather = self.source.weather(lat, lon)?;
        Ok(derive_alerts_at(&weather, Utc::now()))
    }

    pub fn report(&self, lat: f64, lon: f64) -> Result<LocationReport, FetchError> {
        self.report_at(lat, lon, Utc::now())
    }

    /// `report` with an explicit clock for alert ids and `generated_at`.
    pub fn report_at(&self, lat: f64, lon: f64, now: DateTime<Utc>) -> Result<LocationReport, FetchError> {
        let (weather, discharge) = self.fetch_both(lat, lon)?;

        let risk = self.predictor.assess(&weather, &discharge);
        let alerts = derive_alerts_at(&weather, now);

        log::info!(
            "Report ({:.4}, {:.4}): {} p={} via {}, {} alert(s)",
            lat,
            lon,
            risk.risk_level,
            risk.probability,
            risk.model,
            alerts.len()
        );

        Ok(LocationReport {
            latitude: lat,
            longitude: lon,
            risk,
            alerts,
            weather,
            discharge,
            generated_at: now,
        })
    }

    pub fn bulk(&self, locations: &[BulkLocation]) -> Vec<BulkRiskResult> {
        self.bulk_at(locations, Utc::now())
    }

    /// Scores each location independently, in request order. A bad
    /// coordinate or failed weather fetch marks only that entry.
    pub fn bulk_at(&self, locations: &[BulkLocation], now: DateTime<Utc>) -> Vec<BulkRiskResult> {
        let results: Vec<BulkRiskResult> = locations
            .iter()
            .map(|location| {
                if let Err(e) = check_coordinates(location.lat, location.lon) {
                    return BulkRiskResult::failed(location, e);
                }
                match self.report_at(location.lat, location.lon, now) {
                    Ok(report) => BulkRiskResult {
                        lat: location.lat,
                        lon: location.lon,
                        district: location.district.clone(),
                        state: location.state.clone(),
                        risk_level: Some(report.risk.risk_level),
                        risk_score: Some(report.risk.risk_score),
                        probability: Some(report.risk.probability),
                        rainfall_24h: Some(report.weather.rainfall_24h()),
                        error: None,
                    },
                    Err(e) => {
                        log::warn!("Bulk entry ({}, {}) failed: {}", location.lat, location.lon, e);
                        BulkRiskResult::failed(location, e.to_string())
                    }
                }
            })
            .collect();

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        log::info!("Bulk prediction: {} location(s), {} failed", results.len(), failed);
        results
    }

    fn fetch_both(&self, lat: f64, lon: f64) -> Result<(WeatherObservation, DischargeObservation), FetchError> {
        let (tx, rx) = mpsc::channel();

        let source = Arc::clone(&self.source);
        let weather_tx = tx.clone();
        self.pool.execute(move || {
            let _ = weather_tx.send(Fetched::Weather(source.weather(lat, lon)));
        });

        let source = Arc::clone(&self.source);
        self.pool.execute(move || {
            let _ = tx.send(Fetched::Discharge(source.discharge(lat, lon)));
        });

        let mut weather = None;
        let mut discharge = None;
        // Ends early if a worker panicked and dropped its sender.
        for fetched in rx.iter().take(2) {
            match fetched {
                Fetched::Weather(result) => weather = Some(result),
                Fetched::Discharge(obs) => discharge = Some(obs),
            }
        }

        let weather = weather
            .unwrap_or_else(|| Err(FetchError::Network("weather fetch worker exited".to_string())))?;
        let discharge = discharge
            .unwrap_or_else(|| DischargeObservation::unavailable(lat, lon, "discharge fetch worker exited"));

        Ok((weather, discharge))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
