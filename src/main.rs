//! Flood Risk Assessment Service
//!
//! Scores flood risk for any latitude/longitude from live Open-Meteo weather
//! and river discharge, using the trained tree ensemble when one is available
//! and a rule-based scorer otherwise.
//!
//! Usage:
//!   cargo run --release                               # Serve on [endpoint] port
//!   cargo run --release -- --endpoint 8181            # Serve on port 8181
//!   cargo run --release -- --lat 26.14 --lon 91.74    # One-shot JSON report
//!   cargo run --release -- --config /etc/floodrisk.toml
//!
//! Environment:
//!   FLOODRISK_MODEL_PATH, FLOODRISK_TIMEOUT_SECS, FLOODRISK_PORT (see config)
//!   RUST_LOG - log filter (default: info)

use floodrisk_service::config::{ServiceConfig, DEFAULT_CONFIG_PATH};
use floodrisk_service::endpoint;
use floodrisk_service::service::{check_coordinates, FloodService};
use std::env;
use std::path::PathBuf;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--config PATH] [--endpoint PORT] [--lat LAT --lon LON]", program);
    std::process::exit(1);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut endpoint_port: Option<u16> = None;
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(v)) => config_path = PathBuf::from(v),
            ("--endpoint", Some(v)) => endpoint_port = v.parse().ok(),
            ("--lat", Some(v)) => lat = v.parse().ok(),
            ("--lon", Some(v)) => lon = v.parse().ok(),
            (flag @ ("--config" | "--endpoint" | "--lat" | "--lon"), None) => {
                eprintln!("Error: {} requires a value", flag);
                usage(&args[0]);
            }
            (other, _) => {
                eprintln!("Unknown argument: {}", other);
                usage(&args[0]);
            }
        }
        i += 2;
    }

    let mut config = match ServiceConfig::load_with_env(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = endpoint_port {
        config.endpoint.port = port;
    }

    let service = match FloodService::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to initialise upstream client: {}", e);
            std::process::exit(1);
        }
    };

    // One-shot report
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            if let Err(e) = check_coordinates(lat, lon) {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
            match service.report(lat, lon).map(|r| serde_json::to_string_pretty(&r)) {
                Ok(Ok(json)) => println!("{}", json),
                Ok(Err(e)) => {
                    eprintln!("❌ Failed to serialize report: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Weather data unavailable: {}", e);
                    std::process::exit(2);
                }
            }
            return;
        }
        (None, None) => {}
        _ => {
            eprintln!("Error: --lat and --lon must be given together as numbers");
            usage(&args[0]);
        }
    }

    println!("🌊 Flood Risk Assessment Service");
    println!("================================\n");
    match service.predictor().model_description() {
        Some(model) => println!("✓ Trained model loaded: {}", model),
        None => println!("⚠️  No trained model, scoring with rule-based fallback"),
    }
    println!();

    if let Err(e) = endpoint::start_endpoint_server(&config.endpoint.bind_address, config.endpoint.port, service) {
        eprintln!("\n❌ Endpoint server error: {}", e);
        std::process::exit(1);
    }
}
