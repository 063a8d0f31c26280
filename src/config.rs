//! Runtime configuration.
//!
//! Built exactly once at process start and passed by reference into each
//! pipeline stage — component logic never reads the environment itself.
//! Two sources produce the same `Config`: environment variables
//! (optionally seeded from a `.env` file by the binary) or a TOML file
//! whose keys mirror the environment surface.

use std::env;
use std::fs;
use std::time::Duration;

use serde::Deserialize;

use crate::model::WxError;

/// Default OpenWeatherMap current-weather endpoint. `{lat}`, `{lon}` and
/// `{key}` are substituted per request.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://api.openweathermap.org/data/2.5/weather?lat={lat}&lon={lon}&appid={key}&units=metric";

pub const DEFAULT_CITIES_TABLE: &str = "cities";
pub const DEFAULT_RAW_TABLE: &str = "raw_weather";
pub const DEFAULT_BASELINE_TABLE: &str = "baseline_weather";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Weather API URL template with `{lat}`/`{lon}`/`{key}` placeholders.
    pub api_url_template: String,
    /// Weather API key.
    pub api_key: String,
    /// City names to ingest, in request order.
    pub cities: Vec<String>,
    /// Table holding the externally bootstrapped city metadata.
    pub cities_table: String,
    /// Append-only raw observation table.
    pub raw_table: String,
    /// Append-only baseline observation table.
    pub baseline_table: String,
    /// Bound on every weather API request.
    pub http_timeout: Duration,
    /// libpq-style connection string for the backing database.
    pub database_url: String,
}

impl Config {
    /// Builds a configuration from environment variables.
    ///
    /// `WEATHER_API_KEY` and `COMMASEP_CITIES` are required. The database
    /// connection comes from `DATABASE_URL` when set, otherwise it is
    /// assembled from the discrete `POSTGRES_*` variables. Everything
    /// else falls back to a default:
    /// `OPENWEATHER_URL`, `CITIES_TABLE`, `RAW_WEATHER_TABLE`,
    /// `BASELINE_WEATHER_TABLE`, `WEATHER_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, WxError> {
        let api_key = require_env("WEATHER_API_KEY")?;
        let cities = parse_city_list(&require_env("COMMASEP_CITIES")?)?;
        let timeout_secs = match env::var("WEATHER_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                WxError::Config(format!("invalid WEATHER_HTTP_TIMEOUT_SECS: {:?}", raw))
            })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Config {
            api_url_template: env_or("OPENWEATHER_URL", DEFAULT_URL_TEMPLATE),
            api_key,
            cities,
            cities_table: env_or("CITIES_TABLE", DEFAULT_CITIES_TABLE),
            raw_table: env_or("RAW_WEATHER_TABLE", DEFAULT_RAW_TABLE),
            baseline_table: env_or("BASELINE_WEATHER_TABLE", DEFAULT_BASELINE_TABLE),
            http_timeout: Duration::from_secs(timeout_secs),
            database_url: database_url_from_env()?,
        })
    }

    /// Builds a configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, WxError> {
        let text = fs::read_to_string(path)
            .map_err(|e| WxError::Config(format!("failed to read {}: {}", path, e)))?;
        Self::from_toml_str(&text)
    }

    /// Parses the TOML configuration format.
    ///
    /// Required keys: `api_key`, `cities`, `database_url`. Optional keys
    /// mirror the environment surface: `api_url_template`,
    /// `cities_table`, `raw_table`, `baseline_table`,
    /// `http_timeout_secs`.
    pub fn from_toml_str(text: &str) -> Result<Self, WxError> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| WxError::Config(e.to_string()))?;
        if file.cities.is_empty() {
            return Err(WxError::Config("cities list is empty".to_string()));
        }

        Ok(Config {
            api_url_template: file
                .api_url_template
                .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string()),
            api_key: file.api_key,
            cities: file.cities,
            cities_table: file
                .cities_table
                .unwrap_or_else(|| DEFAULT_CITIES_TABLE.to_string()),
            raw_table: file
                .raw_table
                .unwrap_or_else(|| DEFAULT_RAW_TABLE.to_string()),
            baseline_table: file
                .baseline_table
                .unwrap_or_else(|| DEFAULT_BASELINE_TABLE.to_string()),
            http_timeout: Duration::from_secs(
                file.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            database_url: file.database_url,
        })
    }
}

/// On-disk configuration file schema.
#[derive(Debug, Deserialize)]
struct FileConfig {
    api_key: String,
    cities: Vec<String>,
    database_url: String,
    api_url_template: Option<String>,
    cities_table: Option<String>,
    raw_table: Option<String>,
    baseline_table: Option<String>,
    http_timeout_secs: Option<u64>,
}

/// Splits a comma-separated city list, trimming whitespace and dropping
/// empty entries. An entirely empty list is a configuration error.
fn parse_city_list(raw: &str) -> Result<Vec<String>, WxError> {
    let cities: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();
    if cities.is_empty() {
        return Err(WxError::Config("city list is empty".to_string()));
    }
    Ok(cities)
}

fn database_url_from_env() -> Result<String, WxError> {
    if let Ok(url) = env::var("DATABASE_URL") {
        if !url.is_empty() {
            return Ok(url);
        }
    }
    let host = env_or("POSTGRES_HOST", "localhost");
    let port = env_or("POSTGRES_PORT", "5432");
    let dbname = require_env("POSTGRES_DB")?;
    let user = require_env("POSTGRES_USER")?;
    let password = env_or("POSTGRES_PASSWORD", "");
    Ok(format!(
        "host={} port={} dbname={} user={} password={}",
        host, port, dbname, user, password
    ))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn require_env(key: &str) -> Result<String, WxError> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WxError::Config(format!("missing required environment variable {}", key)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
