//! Pipeline run endpoints

use crate::error::Result;
use crate::{OrchestratorClient, handle_response};
use fleetflow_core::domain::stage::Stage;
use fleetflow_core::dto::pipeline::{
    RunListResponse, RunStatusResponse, StartPipeline, StartPipelineResponse,
};
use fleetflow_core::dto::webhook::{WebhookPayload, WebhookResponse};
use reqwest::multipart::{Form, Part};

impl OrchestratorClient {
    /// Start a run from JSON train data
    pub async fn start_pipeline(&self, req: &StartPipeline) -> Result<StartPipelineResponse> {
        let url = format!("{}/pipeline/start", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        handle_response(response).await
    }

    /// Start a run from a CSV file
    ///
    /// # Arguments
    /// * `file_name` - Name reported for the upload; must end in `.csv`
    /// * `content` - Raw CSV bytes
    /// * `days_to_simulate` - Overrides the orchestrator's default
    pub async fn start_pipeline_csv(
        &self,
        file_name: impl Into<String>,
        content: Vec<u8>,
        days_to_simulate: Option<u32>,
    ) -> Result<StartPipelineResponse> {
        let url = format!("{}/pipeline/start-csv", self.base_url);
        let part = Part::bytes(content)
            .file_name(file_name.into())
            .mime_str("text/csv")?;
        let mut form = Form::new().part("file", part);
        if let Some(days) = days_to_simulate {
            form = form.text("days_to_simulate", days.to_string());
        }
        let response = self.client.post(&url).multipart(form).send().await?;

        handle_response(response).await
    }

    /// Get the status of a run
    pub async fn get_status(&self, run_id: &str) -> Result<RunStatusResponse> {
        let url = format!("{}/pipeline/status/{}", self.base_url, run_id);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// List all runs, newest first
    pub async fn list_runs(&self) -> Result<RunListResponse> {
        let url = format!("{}/pipeline/runs", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Deliver a stage completion webhook
    ///
    /// Mostly useful for replaying a callback a stage service failed to send.
    pub async fn send_webhook(
        &self,
        stage: Stage,
        payload: &WebhookPayload,
    ) -> Result<WebhookResponse> {
        let url = format!("{}/webhook/{}-finished", self.base_url, stage);
        let response = self.client.post(&url).json(payload).send().await?;

        handle_response(response).await
    }
}
