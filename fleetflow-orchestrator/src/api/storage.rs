//! Storage API Handlers

use axum::{Json, extract::State};

use crate::api::AppState;
use crate::storage::StorageStats;

/// GET /storage/stats
/// File counts of the shared storage areas
pub async fn storage_stats(State(state): State<AppState>) -> Json<StorageStats> {
    tracing::debug!("Getting storage stats");
    Json(state.storage.stats().await)
}
