//! City weather baseline service.
//!
//! Periodically fetches current-weather observations from the
//! OpenWeatherMap API for a configured set of cities, appends the raw
//! responses to an append-only store, and derives one cleaned "baseline"
//! row per city from each city's latest raw snapshot.
//!
//! The two pipeline stages — `pipeline::run_ingest` and
//! `pipeline::run_transform` — are invoked by an external scheduler
//! (cron or similar) via the `wxbase_service` binary. Both stages are
//! independently resumable: transform always operates on whatever is
//! currently latest, so a missed ingest run simply reprocesses the
//! previous snapshot.

pub mod cities;
pub mod config;
pub mod db;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod pipeline;
