//! CSV upload and ingestion DTOs

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedRow;

/// Lifecycle of an ingestion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Processing,
    Completed,
    Failed,
}

/// Per-entity counters produced by one ingestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub trains: usize,
    pub fitness: usize,
    pub job_cards: usize,
    pub branding: usize,
    pub mileage: usize,
    pub cleaning: usize,
    pub stabling: usize,
    pub operations: usize,
    pub parsed_rows: usize,
    pub skipped_missing_train_fields: usize,
    pub errors: Vec<String>,
}

/// Results attached to an ingestion job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResults {
    pub parsed_count: usize,
    pub parsed_preview: Vec<NormalizedRow>,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub report: Option<IngestReport>,
}

/// Pollable state of an ingestion job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStatus {
    pub status: UploadState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<UploadResults>,
}

impl UploadStatus {
    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            status: UploadState::Processing,
            progress: Some(0),
            message: Some(message.into()),
            results: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == UploadState::Completed
    }
}

/// Response to an accepted upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub message: String,
    pub job_id: String,
    pub status_url: String,
}
