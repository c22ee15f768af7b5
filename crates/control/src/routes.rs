use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::messages::{dispatch, DEFAULT_LOG_LIMIT};
use crate::state::SharedState;

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /api/control
///
/// The generic control channel: a JSON command in, a JSON response out.
/// Malformed commands get 204 No Content — logged server-side, never an error.
pub async fn control(State(state): State<SharedState>, Json(raw): Json<Value>) -> impl IntoResponse {
    match dispatch(&state, raw) {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /api/stats
pub async fn get_stats(State(state): State<SharedState>) -> Json<Value> {
    Json(json!(state.stats.snapshot()))
}

/// Query parameters for the log endpoint.
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LOG_LIMIT
}

/// GET /api/logs
///
/// Most-recent-first slice of the in-memory log ring.
pub async fn get_logs(
    State(state): State<SharedState>,
    Query(params): Query<LogQuery>,
) -> Json<Value> {
    let entries = state.log.recent(params.limit);
    Json(json!({
        "total": state.log.len(),
        "limit": params.limit,
        "entries": entries
    }))
}

/// GET /api/metrics
///
/// Prometheus text exposition of the gateway counters.
pub async fn get_metrics(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        state.stats.export(),
    )
}
