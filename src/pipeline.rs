//! The two pipeline stages: ingest and transform.
//!
//! Each stage is a plain function taking its inputs explicitly — the
//! configuration, a database connection, and (for ingest) an HTTP client
//! — and returning an explicit summary. No stage holds state between
//! runs, so either can be re-run at any time: transform always operates
//! on whatever is currently the latest snapshot per city, which is what
//! makes a missed or delayed ingest run harmless.

use chrono::Utc;
use log::{error, info};
use postgres::Client;

use crate::cities;
use crate::config::Config;
use crate::db;
use crate::ingest::openweather::{self, OwmPayload};
use crate::model::{RawObservation, WxError};
use crate::normalize;

/// Outcome of one ingest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Cities resolved out of the configured name list.
    pub cities_resolved: usize,
    /// Raw rows written, including NULL-payload rows for failed fetches.
    pub rows_written: u64,
    /// Fetches that produced no payload this run.
    pub fetch_failures: usize,
}

/// Outcome of one transform run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSummary {
    /// Latest snapshots selected, one per distinct city in the raw store.
    pub snapshots_selected: usize,
    /// Baseline rows written.
    pub rows_written: usize,
    /// Snapshots skipped for parse or normalization failures.
    pub rows_skipped: usize,
}

/// Ingest stage: fetch one observation per configured city and append
/// the batch to the raw observation store.
///
/// A single `captured_at` is established at the start of the run and
/// shared by every row. Unresolvable names and failed fetches are logged
/// and isolated — a failed fetch still produces a NULL-payload row — so
/// the run succeeds as long as the batch append does. A storage failure
/// fails the whole run for scheduler-level retry.
pub fn run_ingest(
    cfg: &Config,
    db: &mut Client,
    http: &reqwest::blocking::Client,
) -> Result<IngestSummary, WxError> {
    let captured_at = Utc::now().timestamp();
    let cities = cities::resolve(db, &cfg.cities_table, &cfg.cities)?;

    let mut rows = Vec::with_capacity(cities.len());
    let mut fetch_failures = 0;
    for city in &cities {
        let payload = openweather::fetch_one(http, cfg, city.lat, city.lon);
        if payload.is_none() {
            fetch_failures += 1;
        }
        rows.push(RawObservation {
            city_id: city.id,
            captured_at,
            payload: payload.map(|doc| doc.to_string()),
        });
    }

    let rows_written = db::append_raw_batch(db, &cfg.raw_table, &rows)?;
    info!(
        "ingest run at {}: {} raw rows written, {} fetch failures",
        captured_at, rows_written, fetch_failures
    );

    Ok(IngestSummary {
        cities_resolved: cities.len(),
        rows_written,
        fetch_failures,
    })
}

/// Parses one selected snapshot's payload into the wire schema.
///
/// A NULL payload (recorded when the fetch failed) and a non-JSON
/// payload are both parse failures; the caller skips that city for this
/// transform run.
pub fn parse_snapshot(snapshot: &RawObservation) -> Result<OwmPayload, WxError> {
    let text = snapshot.payload.as_deref().ok_or_else(|| {
        WxError::ParseFailure(format!("city {}: no payload captured", snapshot.city_id))
    })?;
    serde_json::from_str(text)
        .map_err(|e| WxError::ParseFailure(format!("city {}: {}", snapshot.city_id, e)))
}

/// Transform stage: normalize the latest raw snapshot of every city and
/// append the results to the baseline store.
///
/// Parse and normalization failures are logged and skip only the
/// affected city; a baseline append failure is fatal to the run.
pub fn run_transform(cfg: &Config, db: &mut Client) -> Result<TransformSummary, WxError> {
    let snapshots = db::latest_per_city(db, &cfg.raw_table)?;

    let mut rows_written = 0;
    let mut rows_skipped = 0;
    for snapshot in &snapshots {
        let payload = match parse_snapshot(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                error!("skipping snapshot: {}", e);
                rows_skipped += 1;
                continue;
            }
        };

        let baseline = match normalize::normalize(&payload) {
            Ok(baseline) => baseline,
            Err(e) => {
                error!("skipping city {}: {}", snapshot.city_id, e);
                rows_skipped += 1;
                continue;
            }
        };

        db::append_baseline(db, &cfg.baseline_table, snapshot.city_id, &baseline)?;
        rows_written += 1;
    }

    info!(
        "transform run: {} baseline rows written, {} skipped",
        rows_written, rows_skipped
    );

    Ok(TransformSummary {
        snapshots_selected: snapshots.len(),
        rows_written,
        rows_skipped,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
