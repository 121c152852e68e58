//! Stage service DTOs
//!
//! Outbound trigger bodies and inbound completion webhooks.

use serde::{Deserialize, Serialize};

use crate::dto::pipeline::RunSummary;

/// Body sent to a stage service's `start-from-file` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRequest {
    pub file_path: String,
    #[serde(rename = "runId")]
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_simulate: Option<u32>,
}

/// Completion callback posted by a stage service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "runId", default)]
    pub run_id: Option<String>,
    #[serde(rename = "filePath", default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Acknowledgement of a webhook
///
/// Stage failures are recorded in the run, not in the HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub ok: bool,
    #[serde(default)]
    pub run: Option<RunSummary>,
}
