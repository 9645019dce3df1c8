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

/// Producer configuration, read from the environment once at startup
/// (SPEC_FULL.md §4.9, §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: std::net::SocketAddr,
    pub app_env: String,
    pub db_connection_url: String,
    pub db_min_conns: u32,
    pub db_max_conns: u32,
    pub db_max_conn_lifetime: Duration,
    pub db_max_conn_idle_time: Duration,
    pub db_health_check_period: Duration,
    pub rabbitmq_conn_url: String,
    pub rabbitmq_queue: String,
    pub rabbitmq_ca_file: Option<PathBuf>,
    pub rabbitmq_cert_file: Option<PathBuf>,
    pub rabbitmq_key_file: Option<PathBuf>,
    pub webapi_tls_cert_file: Option<PathBuf>,
    pub webapi_tls_key_file: Option<PathBuf>,
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

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_port: u16 = env_u32("API_PORT", 8080)? as u16;
        let listen_addr = format!("0.0.0.0:{api_port}").parse().map_err(|_| {
            ConfigError::Invalid {
                name: "API_PORT",
                value: api_port.to_string(),
            }
        })?;
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());

        let db_connection_url = std::env::var("DB_CONNECTION_URL")
            .map_err(|_| ConfigError::Missing("DB_CONNECTION_URL"))?;
        let db_min_conns = env_u32("DB_MIN_CONNS", 1)?;
        let db_max_conns = env_u32("DB_MAX_CONNS", 10)?;
        let db_max_conn_lifetime = env_secs("DB_MAX_CONN_LIFETIME", 1800)?;
        let db_max_conn_idle_time = env_secs("DB_MAX_CONN_IDLE_TIME", 600)?;
        let db_health_check_period = env_secs("DB_HEALTH_CHECK_PERIOD", 30)?;

        let rabbitmq_conn_url = std::env::var("RABBITMQ_CONN_URL")
            .map_err(|_| ConfigError::Missing("RABBITMQ_CONN_URL"))?;
        let rabbitmq_queue =
            std::env::var("RABBITMQ_QUEUE").unwrap_or_else(|_| "process-runs".to_string());
        let rabbitmq_ca_file = std::env::var("RABBITMQ_CA_FILE").ok().map(PathBuf::from);
        let rabbitmq_cert_file = std::env::var("RABBITMQ_CERT_FILE").ok().map(PathBuf::from);
        let rabbitmq_key_file = std::env::var("RABBITMQ_KEY_FILE").ok().map(PathBuf::from);

        let webapi_tls_cert_file = std::env::var("WEBAPI_TLS_CERT_FILE").ok().map(PathBuf::from);
        let webapi_tls_key_file = std::env::var("WEBAPI_TLS_KEY_FILE").ok().map(PathBuf::from);
        if app_env != "local" && (webapi_tls_cert_file.is_none() || webapi_tls_key_file.is_none()) {
            return Err(ConfigError::Missing("WEBAPI_TLS_CERT_FILE/WEBAPI_TLS_KEY_FILE"));
        }

        Ok(Self {
            listen_addr,
            app_env,
            db_connection_url,
            db_min_conns,
            db_max_conns,
            db_max_conn_lifetime,
            db_max_conn_idle_time,
            db_health_check_period,
            rabbitmq_conn_url,
            rabbitmq_queue,
            rabbitmq_ca_file,
            rabbitmq_cert_file,
            rabbitmq_key_file,
            webapi_tls_cert_file,
            webapi_tls_key_file,
        })
    }
}
