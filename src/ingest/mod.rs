/// Upstream observation sources.
///
/// Each provider gets its own file under `ingest/`. All of them satisfy
/// `ObservationSource`, which is what the service layer depends on.

pub mod open_meteo;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::model::{DischargeObservation, FetchError, WeatherObservation};

/// A provider of weather and discharge observations for a point.
///
/// Implementations must bound every network call with a timeout.
pub trait ObservationSource: Send + Sync {
    /// Current weather. Failures are returned to the caller.
    fn weather(&self, lat: f64, lon: f64) -> Result<WeatherObservation, FetchError>;

    /// Current discharge. Never fails: an unreachable provider yields
    /// `DischargeObservation::unavailable`.
    fn discharge(&self, lat: f64, lon: f64) -> DischargeObservation;
}
