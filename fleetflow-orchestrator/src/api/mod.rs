//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod pipeline;
pub mod storage;
pub mod upload;
pub mod webhook;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::announcer::EventAnnouncer;
use crate::service::ingest::Ingestor;
use crate::service::pipeline::PipelineService;
use crate::storage::StorageGateway;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineService>,
    pub ingestor: Arc<Ingestor>,
    pub storage: StorageGateway,
    pub announcer: EventAnnouncer,
    pub max_upload_bytes: usize,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/start", post(pipeline::start_pipeline))
        .route("/pipeline/start-csv", post(pipeline::start_pipeline_csv))
        .route("/pipeline/status/{run_id}", get(pipeline::get_status))
        .route("/pipeline/runs", get(pipeline::list_runs))
        .route("/pipeline/events", get(pipeline::event_stream))
        // Stage completion webhooks
        .route(
            "/webhook/simulation-finished",
            post(webhook::simulation_finished),
        )
        .route("/webhook/moo-finished", post(webhook::moo_finished))
        .route("/webhook/rl-finished", post(webhook::rl_finished))
        // CSV ingestion jobs
        .route("/upload", post(upload::upload_csv))
        .route("/upload-status/{job_id}", get(upload::upload_status))
        // Shared storage
        .route("/storage/stats", get(storage::storage_stats))
        // Add state and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
