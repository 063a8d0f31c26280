/// Core data types for the city weather baseline service.
///
/// This module defines the shared domain model imported by all other
/// modules, plus the service error type. It contains no I/O.

use std::fmt;

// ---------------------------------------------------------------------------
// Pipeline entities
// ---------------------------------------------------------------------------

/// The subset of city metadata the pipeline needs: the stable, externally
/// assigned identifier plus the coordinate pair sent to the weather API.
///
/// Produced by `cities::resolve` from the append-only cities table, which
/// is seeded once by an external bootstrap load and never written by this
/// service.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRef {
    pub id: i32,
    pub lon: f64,
    pub lat: f64,
}

/// One row of the append-only raw observation store.
///
/// `payload` is the verbatim weather API response as JSON text, or `None`
/// when the fetch for this city failed. Failed fetches are recorded, not
/// dropped — a NULL row encodes "we tried and got nothing" for later
/// failure triage. Every row of one ingest run shares the run's single
/// `captured_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub city_id: i32,
    pub captured_at: i64,
    pub payload: Option<String>,
}

/// The normalized, query-ready weather record derived from exactly one
/// raw observation.
///
/// Invariant: `datetime` is the local-time projection of `timestamp`
/// (formatted `YYYY-MM-DD HH:MM`), never an independently sourced value.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineObservation {
    pub timestamp: i64,
    pub datetime: String,
    pub temperature: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub wind_speed: f64,
    pub wind_degree: i32,
    pub cloudiness: f64,
    pub rain: Option<f64>,
    pub snow: Option<f64>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while running the ingest or transform stage.
///
/// Failures local to one unit of work (one city's fetch, one
/// observation's normalization) are logged and isolated by the pipeline;
/// `Storage` and `Config` failures are fatal to the run and surface to
/// the external scheduler, whose whole-run retry is the recovery
/// mechanism.
#[derive(Debug, Clone, PartialEq)]
pub enum WxError {
    /// Non-2xx HTTP response from the weather API.
    HttpStatus(u16),
    /// Transport-level request failure (timeout, DNS, connection reset).
    Transport(String),
    /// A required field was missing from an observation payload.
    /// Carries the JSON path of the first missing field.
    MalformedObservation(&'static str),
    /// A stored raw payload was NULL or not valid JSON at selection time.
    ParseFailure(String),
    /// The persistence backend failed on a shared read or write path.
    Storage(String),
    /// Missing or invalid configuration.
    Config(String),
}

impl fmt::Display for WxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WxError::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            WxError::Transport(msg) => write!(f, "transport error: {}", msg),
            WxError::MalformedObservation(path) => {
                write!(f, "malformed observation: missing required field {}", path)
            }
            WxError::ParseFailure(msg) => write!(f, "payload parse failure: {}", msg),
            WxError::Storage(msg) => write!(f, "storage failure: {}", msg),
            WxError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WxError {}

impl From<postgres::Error> for WxError {
    fn from(err: postgres::Error) -> Self {
        WxError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for WxError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => WxError::HttpStatus(status.as_u16()),
            None => WxError::Transport(err.to_string()),
        }
    }
}
