//! Webhook API Handlers
//!
//! Completion callbacks from the stage services. A reported stage failure is
//! recorded on the run and still answered with 200.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use fleetflow_core::domain::stage::Stage;
use fleetflow_core::dto::pipeline::RunSummary;
use fleetflow_core::dto::webhook::{WebhookPayload, WebhookResponse};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

async fn stage_finished(
    state: AppState,
    stage: Stage,
    body: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<Json<WebhookResponse>> {
    let Json(payload) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let run = state.pipeline.on_stage_finished(stage, payload).await?;
    Ok(Json(WebhookResponse {
        ok: true,
        run: run.as_ref().map(RunSummary::from),
    }))
}

/// POST /webhook/simulation-finished
pub async fn simulation_finished(
    State(state): State<AppState>,
    body: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<Json<WebhookResponse>> {
    stage_finished(state, Stage::Simulation, body).await
}

/// POST /webhook/moo-finished
pub async fn moo_finished(
    State(state): State<AppState>,
    body: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<Json<WebhookResponse>> {
    stage_finished(state, Stage::Moo, body).await
}

/// POST /webhook/rl-finished
pub async fn rl_finished(
    State(state): State<AppState>,
    body: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<Json<WebhookResponse>> {
    stage_finished(state, Stage::Rl, body).await
}
