// SPDX-License-Identifier: MIT

//! Query and control endpoints over process runs (SPEC_FULL.md §6).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use procrun_bus::MessageBus;
use procrun_core::{ProcessLog, ProcessRun};
use procrun_storage::{LogsRepo, RunsRepo};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct AppState {
    pub pool: PgPool,
    pub bus: Arc<MessageBus>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/listProcesses", axum::routing::get(list_processes))
        .route("/listProcess/:id", axum::routing::get(get_process))
        .route("/stopProcess/:id", axum::routing::post(stop_process))
        .route("/processlog/:id", axum::routing::get(process_log))
        .route("/healthz", axum::routing::get(healthz))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

async fn list_processes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProcessRun>>, ApiError> {
    let runs = RunsRepo::list(&state.pool)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(runs))
}

async fn get_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessRun>, ApiError> {
    let run = RunsRepo::get(&state.pool, id)
        .await
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    Ok(Json(run))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Flips the run's stored status to `stopped`. Does not reach into the
/// executor running the task graph and cannot cancel in-flight work — see
/// `procrun_engine::RunDriver::execute`'s cancellation token, which is only
/// ever derived from process shutdown, never from this endpoint.
async fn stop_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let stopped = RunsRepo::mark_stopped(&state.pool, id, chrono::Utc::now())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !stopped {
        return Err(ApiError::NotFound(format!("process run {id} not found")));
    }
    Ok(Json(MessageResponse {
        message: "process marked as stopped".to_string(),
    }))
}

async fn process_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProcessLog>>, ApiError> {
    let logs = LogsRepo::for_run(&state.pool, id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(logs))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let bus_ok = state.bus.is_ready();

    let mut components = BTreeMap::new();
    components.insert("database", if db_ok { "ok" } else { "unavailable" });
    components.insert("bus", if bus_ok { "ok" } else { "unavailable" });

    let status = if db_ok && bus_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(components)).into_response()
}
