// SPDX-License-Identifier: MIT

//! Loader binary: watches a directory for process-definition files and
//! hands each one to the producer (SPEC_FULL.md §4.1).

mod config;
mod scan;

use crate::config::Config;
use procrun_adapters::ProducerClient;
use procrun_supervisor::Supervisor;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .min_connections(config.db_min_conns)
        .max_connections(config.db_max_conns)
        .max_lifetime(config.db_max_conn_lifetime)
        .idle_timeout(config.db_max_conn_idle_time)
        .connect(&config.db_connection_url)
        .await?;
    procrun_storage::migrate(&pool).await?;

    let producer = Arc::new(ProducerClient::new(config.producer_url.clone()));
    let watch_dir = config.watch_dir.clone();
    let scan_interval = config.scan_interval;

    let mut supervisor = Supervisor::new();
    supervisor.spawn("file-scanner", move |cancel| {
        let pool = pool.clone();
        async move {
            let mut ticker = tokio::time::interval(scan_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = ticker.tick() => {
                        if let Err(err) = scan::scan_once(&pool, &producer, &watch_dir).await {
                            tracing::warn!(error = %err, "scan pass failed");
                        }
                    }
                }
            }
        }
    });

    supervisor.run().await?;
    Ok(())
}
