//! Pipeline run DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::run::{PipelineRun, RunStatus};

/// One train in a JSON start request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainData {
    #[serde(rename = "trainId", default)]
    pub train_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<serde_json::Number>,
    #[serde(rename = "currentLoad", default, skip_serializing_if = "Option::is_none")]
    pub current_load: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub status: String,
}

/// Request to start a run from JSON train data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartPipeline {
    #[serde(default)]
    pub trains: Vec<TrainData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_simulate: Option<u32>,
}

/// Metadata echoed back when a run starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMetadata {
    pub days_to_simulate: u32,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(rename = "originalFilename", default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(rename = "fileSize", default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<usize>,
}

/// Response to a start request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPipelineResponse {
    pub success: bool,
    pub message: String,
    pub run_id: String,
    pub file_path: String,
    pub status: RunStatus,
    pub trains_processed: usize,
    pub metadata: StartMetadata,
}

/// Externally visible view of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub details: serde_json::Value,
}

impl From<&PipelineRun> for RunSummary {
    fn from(run: &PipelineRun) -> Self {
        RunSummary {
            run_id: run.run_id.clone(),
            status: run.status,
            started_at: run.started_at,
            details: serde_json::to_value(&run.details).unwrap_or_default(),
        }
    }
}

/// Response to a status query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub run: RunSummary,
}

/// Response to a run listing, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunListResponse {
    pub success: bool,
    pub runs: Vec<RunSummary>,
    pub total_runs: usize,
}
