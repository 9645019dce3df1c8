// SPDX-License-Identifier: MIT

//! Producer binary: accepts `POST /startProcess` and publishes a
//! [`procrun_core::Message`] for the consumer (SPEC_FULL.md §4.3).

mod config;
mod routes;
mod templating;

use crate::config::Config;
use crate::routes::AppState;
use procrun_supervisor::Supervisor;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
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

    let bus =
        procrun_bus::MessageBus::connect(&config.rabbitmq_conn_url, &config.rabbitmq_queue).await?;
    let state = Arc::new(AppState { pool, bus });
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    let mut supervisor = Supervisor::new();
    supervisor.spawn("http-server", move |cancel| async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        Ok(())
    });

    supervisor.run().await?;
    Ok(())
}
