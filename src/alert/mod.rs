/// Alert derivation.
///
/// Submodules:
/// - `thresholds`    - rule families that turn observations into alert records
/// - `weather_codes` - WMO weather code descriptions used in alert text

pub mod thresholds;
pub mod weather_codes;

pub use thresholds::{derive_alerts, derive_alerts_at};
