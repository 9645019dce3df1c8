// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

fn env_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
        Err(_) => Ok(default),
    }
}

fn env_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Ok(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid { name, value: v }),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

/// Loader configuration, read from the environment once at startup
/// (SPEC_FULL.md §4.9, §6). `PROCESS_CFG_DIR` is the one field that only
/// matters to this binary; the DB knobs mirror the producer/consumer ones
/// exactly so the three binaries can share a deployment's environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub watch_dir: PathBuf,
    pub producer_url: String,
    pub scan_interval: Duration,
    pub db_connection_url: String,
    pub db_min_conns: u32,
    pub db_max_conns: u32,
    pub db_max_conn_lifetime: Duration,
    pub db_max_conn_idle_time: Duration,
    pub db_health_check_period: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let watch_dir = std::env::var("PROCESS_CFG_DIR")
            .map_err(|_| ConfigError::Missing("PROCESS_CFG_DIR"))?
            .into();
        let producer_url = std::env::var("PROCRUN_PRODUCER_URL")
            .map_err(|_| ConfigError::Missing("PROCRUN_PRODUCER_URL"))?;
        let scan_interval = env_secs("PROCRUN_SCAN_INTERVAL_SECS", 60)?;

        let db_connection_url = std::env::var("DB_CONNECTION_URL")
            .map_err(|_| ConfigError::Missing("DB_CONNECTION_URL"))?;
        let db_min_conns = env_u32("DB_MIN_CONNS", 1)?;
        let db_max_conns = env_u32("DB_MAX_CONNS", 10)?;
        let db_max_conn_lifetime = env_secs("DB_MAX_CONN_LIFETIME", 1800)?;
        let db_max_conn_idle_time = env_secs("DB_MAX_CONN_IDLE_TIME", 600)?;
        let db_health_check_period = env_secs("DB_HEALTH_CHECK_PERIOD", 30)?;

        Ok(Self {
            watch_dir,
            producer_url,
            scan_interval,
            db_connection_url,
            db_min_conns,
            db_max_conns,
            db_max_conn_lifetime,
            db_max_conn_idle_time,
            db_health_check_period,
        })
    }
}
