//! Scheduler entry point.
//!
//! Runs one pipeline invocation and exits, so an external scheduler
//! (cron or similar) owns cadence and retry policy:
//!
//! ```text
//! wxbase_service ingest      # fetch and append raw observations
//! wxbase_service transform   # normalize latest snapshots into baseline
//! wxbase_service run         # both stages in sequence (default)
//! ```
//!
//! Configuration comes from the environment (a `.env` file is honored),
//! or from a TOML file when `WXBASE_CONFIG` points at one. Exit status:
//! 0 on success, 1 on a run-fatal failure (retry the run), 2 on a
//! configuration or usage error (retrying will not help).

use std::env;
use std::process;

use wxbase_service::config::Config;
use wxbase_service::db;
use wxbase_service::model::WxError;
use wxbase_service::pipeline;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let stage = env::args().nth(1).unwrap_or_else(|| "run".to_string());
    if !matches!(stage.as_str(), "ingest" | "transform" | "run") {
        eprintln!("unknown stage {:?}; expected ingest, transform or run", stage);
        process::exit(2);
    }

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = run_stage(&stage, &cfg) {
        log::error!("{} run failed: {}", stage, e);
        process::exit(1);
    }
}

fn load_config() -> Result<Config, WxError> {
    match env::var("WXBASE_CONFIG") {
        Ok(path) => Config::from_file(&path),
        Err(_) => Config::from_env(),
    }
}

fn run_stage(stage: &str, cfg: &Config) -> Result<(), WxError> {
    let mut db = db::connect(cfg)?;

    if stage == "ingest" || stage == "run" {
        let http = http_client(cfg)?;
        pipeline::run_ingest(cfg, &mut db, &http)?;
    }
    if stage == "transform" || stage == "run" {
        pipeline::run_transform(cfg, &mut db)?;
    }
    Ok(())
}

fn http_client(cfg: &Config) -> Result<reqwest::blocking::Client, WxError> {
    reqwest::blocking::Client::builder()
        .timeout(cfg.http_timeout)
        .build()
        .map_err(|e| WxError::Config(format!("failed to build HTTP client: {}", e)))
}
