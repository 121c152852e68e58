//! Health Check API Handler

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::AppState;

/// GET /health
/// Liveness check with the number of tracked runs
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "runs": state.pipeline.list().len(),
    }))
}
