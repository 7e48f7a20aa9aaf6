/// Service configuration loader - parses floodrisk.toml
///
/// Keeps deployment details (model artifact location, upstream timeouts,
/// endpoint port) out of the code so they can change without recompiling.
/// Every field has a default; a missing file means "all defaults", while a
/// file that exists but cannot be parsed is an error.
///
/// Environment overrides (applied after the file, `.env` honoured):
/// - `FLOODRISK_MODEL_PATH`   - `[model] artifact_path`
/// - `FLOODRISK_TIMEOUT_SECS` - `[upstream] timeout_secs`
/// - `FLOODRISK_PORT`         - `[endpoint] port`

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "floodrisk.toml";

pub const FORECAST_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const FLOOD_BASE_URL: &str = "https://flood-api.open-meteo.com/v1/flood";

// ---------------------------------------------------------------------------
// Configuration structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model: ModelConfig,
    pub upstream: UpstreamConfig,
    pub endpoint: EndpointConfig,
    pub workers: WorkerConfig,
}

/// Location of the trained model artifact.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { artifact_path: PathBuf::from("models/flood_model.json") }
    }
}

/// Open-Meteo API settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout. Upstream calls never wait longer than this.
    pub timeout_secs: u64,
    /// IANA timezone for daily aggregation (e.g. "Asia/Kolkata").
    pub timezone: String,
    pub forecast_base_url: String,
    pub flood_base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            timezone: "Asia/Kolkata".to_string(),
            forecast_base_url: FORECAST_BASE_URL.to_string(),
            flood_base_url: FLOOD_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0".to_string(), port: 8080 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Threads used to fetch weather and discharge concurrently.
    pub fetch_threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { fetch_threads: 2 }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Failed to read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ServiceConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// `load` followed by environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `FLOODRISK_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("FLOODRISK_MODEL_PATH") {
            self.model.artifact_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup("FLOODRISK_TIMEOUT_SECS") {
            self.upstream.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("FLOODRISK_TIMEOUT_SECS='{}'", secs)))?;
        }
        if let Some(port) = lookup("FLOODRISK_PORT") {
            self.endpoint.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("FLOODRISK_PORT='{}'", port)))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_secs must be > 0".to_string()));
        }
        if self.workers.fetch_threads == 0 {
            return Err(ConfigError::Invalid("workers.fetch_threads must be > 0".to_string()));
        }
        if self.upstream.timezone.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.timezone must not be empty".to_string()));
        }
        Ok(())
    }
}
