// SPDX-License-Identifier: MIT

//! `POST /startProcess` (SPEC_FULL.md §4.3, §6): accepts either a full
//! [`ProcessDefinition`] (variant A) or `{name, parameters}` against a
//! previously-stored template (variant B).

use crate::templating;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use procrun_core::{validate, Message, ProcessDefinition};
use procrun_storage::{run_atomically, DefinitionsRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub struct AppState {
    pub pool: PgPool,
    pub bus: procrun_bus::MessageBus,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/startProcess", axum::routing::post(start_process))
        .route("/healthz", axum::routing::get(healthz))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct StartProcessRequest {
    name: String,
    #[serde(default)]
    params: Vec<procrun_core::Param>,
    // Absent entirely for variant B (template lookup by name); present
    // (even as an empty list, per the boundary case of a full definition
    // with zero tasks) for variant A. `#[serde(default)]` would collapse
    // both cases to the same value and misroute the boundary one, so the
    // discriminator is presence, not emptiness.
    tasks: Option<Vec<procrun_core::Task>>,
    #[serde(default)]
    parameters: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct StartProcessResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

enum ApiError {
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

async fn start_process(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartProcessRequest>,
) -> Result<Json<StartProcessResponse>, ApiError> {
    let definition = match body.tasks {
        None => {
            // Variant B: look up the stored template and render it.
            let template = procrun_storage::DefinitionsRepo::get(&state.pool, &body.name)
                .await
                .map_err(|e| ApiError::NotFound(e.to_string()))?;
            templating::render(&template, &body.parameters)
                .map_err(|e| ApiError::Validation(e.to_string()))?
        }
        Some(tasks) => {
            // Variant A: a full definition, stored as the template for
            // future variant-B calls by name. A definition with an empty
            // `tasks` list is still variant A as long as the key was sent.
            let mut definition = ProcessDefinition {
                name: body.name,
                params: body.params,
                tasks,
            };
            validate(&mut definition).map_err(|e| ApiError::Validation(e.to_string()))?;
            definition
        }
    };

    let message = Message::new(definition.clone());

    run_atomically(&state.pool, |tx| {
        let definition = definition.clone();
        async move { DefinitionsRepo::upsert(tx, &definition).await }
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    state
        .bus
        .publish(&message)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(StartProcessResponse {
        message: "successfully added process".to_string(),
    }))
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
