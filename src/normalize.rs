//! Raw payload to baseline schema mapping.
//!
//! `normalize` is a pure function: the same payload always yields the
//! same fields, and nothing here touches the network or the database.
//! Failure of one observation never affects its siblings — the pipeline
//! logs and skips per observation.

use chrono::{Local, TimeZone};

use crate::ingest::openweather::OwmPayload;
use crate::model::{BaselineObservation, WxError};

/// Formats an epoch-seconds instant as naive local wall time,
/// `YYYY-MM-DD HH:MM`. No timezone conversion beyond the system default.
/// Returns `None` only for epochs outside chrono's representable range.
fn format_local(epoch: i64) -> Option<String> {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

/// Maps one raw observation document into the baseline schema.
///
/// The six core fields (`main.temp`, `weather[0].main`,
/// `weather[0].description`, `wind.speed`, `wind.deg`, `clouds.all`)
/// plus the capture instant `dt` are required — there is no defaulting
/// policy for them, so the first missing one fails this single
/// observation with `MalformedObservation`. The hourly accumulations
/// `rain.1h` and `snow.1h` are optional and map to `None` when absent.
pub fn normalize(payload: &OwmPayload) -> Result<BaselineObservation, WxError> {
    let timestamp = payload.dt.ok_or(WxError::MalformedObservation("dt"))?;
    let datetime = format_local(timestamp).ok_or(WxError::MalformedObservation("dt"))?;

    let temperature = payload
        .main
        .as_ref()
        .and_then(|m| m.temp)
        .ok_or(WxError::MalformedObservation("main.temp"))?;

    let condition = payload
        .weather
        .first()
        .ok_or(WxError::MalformedObservation("weather[0]"))?;
    let weather_main = condition
        .main
        .clone()
        .ok_or(WxError::MalformedObservation("weather[0].main"))?;
    let weather_description = condition
        .description
        .clone()
        .ok_or(WxError::MalformedObservation("weather[0].description"))?;

    let wind = payload.wind.as_ref();
    let wind_speed = wind
        .and_then(|w| w.speed)
        .ok_or(WxError::MalformedObservation("wind.speed"))?;
    let wind_degree = wind
        .and_then(|w| w.deg)
        .ok_or(WxError::MalformedObservation("wind.deg"))?;

    let cloudiness = payload
        .clouds
        .as_ref()
        .and_then(|c| c.all)
        .ok_or(WxError::MalformedObservation("clouds.all"))?;

    Ok(BaselineObservation {
        timestamp,
        datetime,
        temperature,
        weather_main,
        weather_description,
        wind_speed,
        wind_degree,
        cloudiness,
        rain: payload.rain.as_ref().and_then(|p| p.one_hour),
        snow: payload.snow.as_ref().and_then(|p| p.one_hour),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
