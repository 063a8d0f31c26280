//! City name resolution over the cities table.
//!
//! The cities table is seeded once by an external bootstrap load of the
//! OpenWeatherMap city list and is effectively immutable afterward; this
//! module only reads it.

use log::warn;
use postgres::Client;

use crate::model::{CityRef, WxError};

/// Resolves human-readable city names to `(id, lon, lat)` triples.
///
/// A name with no matching row is logged as a warning and omitted from
/// the result — partial resolution is acceptable and the pipeline
/// tolerates a shrinking working set. A database error aborts the run.
///
/// Duplicate city names exist in the source data (there is more than one
/// Springfield); one matching row is taken per name.
pub fn resolve(db: &mut Client, table: &str, names: &[String]) -> Result<Vec<CityRef>, WxError> {
    let query = format!("SELECT id, lon, lat FROM {} WHERE name = $1 LIMIT 1", table);

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match db.query_opt(query.as_str(), &[name])? {
            Some(row) => out.push(CityRef {
                id: row.get(0),
                lon: row.get(1),
                lat: row.get(2),
            }),
            None => warn!("city {:?} not found, skipping", name),
        }
    }
    Ok(out)
}
