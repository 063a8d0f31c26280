//! PostgreSQL access for the three pipeline tables.
//!
//! Table names come from configuration. The idempotent DDL lives in
//! `sql/001_schema.sql` and is applied by deployment setup, not by this
//! service — see that file for the exact column definitions.
//!
//! All three tables are append-only with a single writer each: ingest
//! writes the raw table, transform writes the baseline table, and the
//! cities table is written only by the external bootstrap load. That
//! discipline is what makes overlapping runs benign and replay safe.

use postgres::{Client, NoTls};

use crate::config::Config;
use crate::model::{BaselineObservation, RawObservation, WxError};

/// Opens a connection to the configured database.
pub fn connect(cfg: &Config) -> Result<Client, WxError> {
    Client::connect(&cfg.database_url, NoTls).map_err(WxError::from)
}

// ---------------------------------------------------------------------------
// Raw observation store
// ---------------------------------------------------------------------------

/// Appends one ingest run's rows to the raw observation store.
///
/// The batch is a single transaction — all-or-nothing from the
/// pipeline's perspective. Any failure rolls the whole batch back and is
/// fatal to the run; the external scheduler retries the run wholesale.
pub fn append_raw_batch(
    db: &mut Client,
    table: &str,
    rows: &[RawObservation],
) -> Result<u64, WxError> {
    let insert = format!(
        "INSERT INTO {} (city_id, captured_at, payload) VALUES ($1, $2, $3)",
        table
    );

    let mut tx = db.transaction()?;
    let mut written = 0;
    for row in rows {
        written += tx.execute(insert.as_str(), &[&row.city_id, &row.captured_at, &row.payload])?;
    }
    tx.commit()?;
    Ok(written)
}

/// Selects the most recent raw observation for each distinct city.
///
/// Ties on `captured_at` resolve to the highest auto-sequence id, i.e.
/// the row inserted last. Pure read; calling this twice without an
/// intervening ingest returns the same result set.
pub fn latest_per_city(db: &mut Client, table: &str) -> Result<Vec<RawObservation>, WxError> {
    let query = format!(
        "SELECT DISTINCT ON (city_id) city_id, captured_at, payload \
         FROM {} \
         ORDER BY city_id, captured_at DESC, id DESC",
        table
    );

    let rows = db.query(query.as_str(), &[])?;
    Ok(rows
        .iter()
        .map(|row| RawObservation {
            city_id: row.get(0),
            captured_at: row.get(1),
            payload: row.get(2),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Baseline store
// ---------------------------------------------------------------------------

/// Appends one normalized row to the baseline store.
///
/// Single-row insert, no duplicate guard on `(city_id, timestamp)`:
/// re-running transform on an unchanged latest snapshot appends a
/// duplicate baseline row. A failure here is fatal to the transform run.
pub fn append_baseline(
    db: &mut Client,
    table: &str,
    city_id: i32,
    obs: &BaselineObservation,
) -> Result<(), WxError> {
    let insert = format!(
        "INSERT INTO {} (city_id, timestamp, datetime, temperature, weather_main, \
         weather_description, wind_speed, wind_degree, cloudiness, rain, snow) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        table
    );

    db.execute(
        insert.as_str(),
        &[
            &city_id,
            &obs.timestamp,
            &obs.datetime,
            &obs.temperature,
            &obs.weather_main,
            &obs.weather_description,
            &obs.wind_speed,
            &obs.wind_degree,
            &obs.cloudiness,
            &obs.rain,
            &obs.snow,
        ],
    )?;
    Ok(())
}
