/// HTTP endpoint for flood risk queries
///
/// Provides a small JSON API over the assessment service.
///
/// Endpoints:
/// - GET  /health                 - Service health check
/// - GET  /predict/{lat}/{lon}    - Risk, alerts and observations for a point
/// - GET  /alerts/{lat}/{lon}     - Alerts derived from current weather
/// - GET  /weather/{lat}/{lon}    - Current weather observation
/// - GET  /discharge/{lat}/{lon}  - Current river discharge observation
/// - POST /assess                 - Score a caller-supplied observation pair
/// - POST /predict/bulk           - Risk summary for up to 100 locations

use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Read;
use tiny_http::Method;

use crate::model::{DischargeObservation, FetchError, WeatherObservation};
use crate::service::{check_coordinates, BulkLocation, FloodService, MAX_BULK_LOCATIONS};

const AVAILABLE_ENDPOINTS: [&str; 7] = [
    "GET /health",
    "GET /predict/{lat}/{lon}",
    "GET /alerts/{lat}/{lon}",
    "GET /weather/{lat}/{lon}",
    "GET /discharge/{lat}/{lon}",
    "POST /assess",
    "POST /predict/bulk",
];

/// Body of `POST /assess`. Either half may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssessRequest {
    pub weather: WeatherObservation,
    pub discharge: DischargeObservation,
}

/// Body of `POST /predict/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub locations: Vec<BulkLocation>,
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Maps a request to a status code and JSON body. No I/O beyond what the
/// service itself performs.
pub fn route(service: &FloodService, method: &Method, url: &str, body: &str) -> (u16, Value) {
    let path = url.split('?').next().unwrap_or("");
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        (Method::Get, ["health"]) => handle_health(service),
        (Method::Post, ["assess"]) => handle_assess(service, body),
        (Method::Post, ["predict", "bulk"]) => handle_bulk(service, body),
        (Method::Get, [kind @ ("predict" | "alerts" | "weather" | "discharge"), lat, lon]) => {
            match parse_coordinates(lat, lon) {
                Ok((lat, lon)) => handle_location(service, kind, lat, lon),
                Err(e) => (400, json!({ "error": e })),
            }
        }
        _ => (
            404,
            json!({
                "error": "Not found",
                "available_endpoints": AVAILABLE_ENDPOINTS
            }),
        ),
    }
}

fn parse_coordinates(lat: &str, lon: &str) -> Result<(f64, f64), String> {
    let lat: f64 = lat
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat))?;
    let lon: f64 = lon
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon))?;
    check_coordinates(lat, lon)?;
    Ok((lat, lon))
}

fn handle_health(service: &FloodService) -> (u16, Value) {
    let predictor = service.predictor();
    (
        200,
        json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "model_loaded": predictor.has_model(),
            "model": predictor.model_description(),
        }),
    )
}

fn handle_assess(service: &FloodService, body: &str) -> (u16, Value) {
    let request: AssessRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return (400, json!({ "error": format!("invalid request body: {}", e) })),
    };
    to_json(&service.assess(&request.weather, &request.discharge))
}

fn handle_bulk(service: &FloodService, body: &str) -> (u16, Value) {
    let request: BulkRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return (400, json!({ "error": format!("invalid request body: {}", e) })),
    };
    if request.locations.len() > MAX_BULK_LOCATIONS {
        return (
            400,
            json!({ "error": format!("at most {} locations per request, got {}", MAX_BULK_LOCATIONS, request.locations.len()) }),
        );
    }
    to_json(&json!({ "results": service.bulk(&request.locations) }))
}

fn handle_location(service: &FloodService, kind: &str, lat: f64, lon: f64) -> (u16, Value) {
    let result = match kind {
        "predict" => service.report(lat, lon).map(|r| serde_json::to_value(r)),
        "alerts" => service.alerts(lat, lon).map(|a| serde_json::to_value(a)),
        "weather" => service.weather(lat, lon).map(|w| serde_json::to_value(w)),
        _ => Ok(serde_json::to_value(service.discharge(lat, lon))),
    };

    match result {
        Ok(Ok(value)) => (200, value),
        Ok(Err(e)) => (500, json!({ "error": format!("serialization failed: {}", e) })),
        Err(e) => upstream_failure(&e, lat, lon),
    }
}

fn upstream_failure(error: &FetchError, lat: f64, lon: f64) -> (u16, Value) {
    log::warn!("Weather fetch failed for ({}, {}): {}", lat, lon, error);
    (
        502,
        json!({
            "error": format!("weather data unavailable: {}", error),
            "lat": lat,
            "lon": lon
        }),
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> (u16, Value) {
    match serde_json::to_value(value) {
        Ok(v) => (200, v),
        Err(e) => (500, json!({ "error": format!("serialization failed: {}", e) })),
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on `bind_address:port`. Blocks forever.
pub fn start_endpoint_server(bind_address: &str, port: u16, service: FloodService) -> Result<(), String> {
    let addr = format!("{}:{}", bind_address, port);
    let server = tiny_http::Server::http(&addr)
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    println!("📡 HTTP endpoint listening on http://{}", addr);
    for endpoint in AVAILABLE_ENDPOINTS {
        println!("   {}", endpoint);
    }
    println!();

    for mut request in server.incoming_requests() {
        let mut body = String::new();
        if let Err(e) = request.as_reader().read_to_string(&mut body) {
            log::warn!("Failed to read request body: {}", e);
        }

        let method = request.method().clone();
        let url = request.url().to_string();
        let (status, json) = route(&service, &method, &url, &body);
        log::debug!("{} {} -> {}", method, url, status);

        if let Err(e) = request.respond(create_response(status, &json)) {
            log::error!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

/// Create HTTP response with JSON body
fn create_response(status_code: u16, json: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(json).unwrap_or_else(|_| "{}".to_string());

    let response = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(status_code));

    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(_) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
