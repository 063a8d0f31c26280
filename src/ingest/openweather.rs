/// OpenWeatherMap current-weather API client.
///
/// Fetches one observation per coordinate pair and defines the wire
/// schema consumed by normalization. Every response field is optional at
/// the deserialization layer — a partial payload still gets recorded
/// verbatim in the raw store, and required-field enforcement happens in
/// `normalize` where a missing field can be reported per observation.
///
/// API documentation: https://openweathermap.org/current

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::model::WxError;

// ============================================================================
// Wire structures
// ============================================================================

/// Current-weather response document.
#[derive(Debug, Clone, Deserialize)]
pub struct OwmPayload {
    /// Capture instant, epoch seconds.
    pub dt: Option<i64>,
    pub main: Option<OwmMain>,
    /// Weather condition list; the first element is the significant one.
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    pub wind: Option<OwmWind>,
    pub clouds: Option<OwmClouds>,
    pub rain: Option<OwmPrecip>,
    pub snow: Option<OwmPrecip>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmMain {
    /// Temperature in the requested units (metric by default).
    pub temp: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmCondition {
    pub main: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmWind {
    pub speed: Option<f64>,
    pub deg: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmClouds {
    /// Cloudiness, percent.
    pub all: Option<f64>,
}

/// Precipitation accumulation block; OpenWeatherMap keys the one-hour
/// volume as `"1h"`.
#[derive(Debug, Clone, Deserialize)]
pub struct OwmPrecip {
    #[serde(rename = "1h")]
    pub one_hour: Option<f64>,
}

// ============================================================================
// API client
// ============================================================================

/// Expands the configured URL template for one coordinate pair.
pub fn build_url(template: &str, lat: f64, lon: f64, key: &str) -> String {
    template
        .replace("{lat}", &lat.to_string())
        .replace("{lon}", &lon.to_string())
        .replace("{key}", key)
}

/// Issues one request and surfaces its failure modes as typed errors:
/// `Transport` for request/body failures, `HttpStatus` for a non-2xx
/// response.
fn request_observation(
    http: &reqwest::blocking::Client,
    url: &str,
) -> Result<Value, WxError> {
    let response = http.get(url).send()?;
    if !response.status().is_success() {
        return Err(WxError::HttpStatus(response.status().as_u16()));
    }
    Ok(response.json::<Value>()?)
}

/// Fetches the current observation for one coordinate pair.
///
/// Any failure is logged and collapses to `None` so that a single
/// city's fetch never aborts the batch; the caller records `None` as a
/// NULL-payload raw row. The URL is not logged because it carries the
/// API key.
pub fn fetch_one(
    http: &reqwest::blocking::Client,
    cfg: &Config,
    lat: f64,
    lon: f64,
) -> Option<Value> {
    let url = build_url(&cfg.api_url_template, lat, lon, &cfg.api_key);

    match request_observation(http, &url) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!("weather fetch for {},{} failed: {}", lat, lon, e);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
