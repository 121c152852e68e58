//! Pipeline API Handlers
//!
//! HTTP endpoints for starting and observing pipeline runs.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{
        Multipart, Path, State, multipart::MultipartRejection, rejection::JsonRejection,
    },
    response::sse::{Event, KeepAlive, Sse},
};
use fleetflow_core::dto::pipeline::{
    RunListResponse, RunStatusResponse, RunSummary, StartPipeline, StartPipelineResponse,
};
use futures::stream::Stream;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::api::upload::read_form;

/// POST /pipeline/start
/// Start a run from JSON train data
pub async fn start_pipeline(
    State(state): State<AppState>,
    body: Result<Json<StartPipeline>, JsonRejection>,
) -> ApiResult<Json<StartPipelineResponse>> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::info!("Starting pipeline with {} train(s)", req.trains.len());

    let response = state.pipeline.start_from_trains(req).await?;
    Ok(Json(response))
}

/// POST /pipeline/start-csv
/// Start a run from an uploaded CSV file (multipart field `file`)
pub async fn start_pipeline_csv(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<StartPipelineResponse>> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let form = read_form(multipart, state.max_upload_bytes).await?;

    let file = form.file.ok_or_else(|| {
        ApiError::BadRequest("No CSV file uploaded. Please attach a CSV file.".to_string())
    })?;
    if !file.looks_like_csv() {
        return Err(ApiError::BadRequest("Only CSV files are allowed".to_string()));
    }

    let days_to_simulate = match form.fields.get("days_to_simulate") {
        Some(raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
            ApiError::BadRequest("days_to_simulate must be a non-negative integer".to_string())
        })?),
        None => None,
    };

    tracing::info!(
        "Starting pipeline from CSV {:?} ({} bytes)",
        file.file_name,
        file.data.len()
    );

    let response = state
        .pipeline
        .start_from_csv(file.file_name, &file.data, days_to_simulate)
        .await?;
    Ok(Json(response))
}

/// GET /pipeline/status/{run_id}
/// Get the state of a run
pub async fn get_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<RunStatusResponse>> {
    tracing::debug!("Getting pipeline status: {}", run_id);

    let run = state.pipeline.get(&run_id)?;
    Ok(Json(RunStatusResponse {
        success: true,
        run: RunSummary::from(&run),
    }))
}

/// GET /pipeline/runs
/// List all runs, newest first
pub async fn list_runs(State(state): State<AppState>) -> Json<RunListResponse> {
    tracing::debug!("Listing pipeline runs");

    let runs: Vec<RunSummary> = state.pipeline.list().iter().map(RunSummary::from).collect();
    Json(RunListResponse {
        success: true,
        total_runs: runs.len(),
        runs,
    })
}

/// GET /pipeline/events
/// Live run-state changes; a new connection replaces the previous listener
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("New SSE client connected to pipeline events");

    let mut rx = state.announcer.subscribe();
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok(Event::default().event(event.name()).data(json)),
                Err(e) => tracing::warn!("SSE: Failed to serialize {} event: {}", event.name(), e),
            }
        }
        tracing::debug!("SSE: Pipeline event stream replaced or closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
