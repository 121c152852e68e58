//! CSV upload job endpoints

use crate::error::Result;
use crate::{OrchestratorClient, handle_response};
use fleetflow_core::dto::upload::{UploadAccepted, UploadStatus};
use reqwest::multipart::{Form, Part};

impl OrchestratorClient {
    /// Upload a CSV for ingestion into the train store
    ///
    /// Returns immediately with the job id; poll [`OrchestratorClient::upload_status`].
    pub async fn upload_csv(
        &self,
        file_name: impl Into<String>,
        content: Vec<u8>,
    ) -> Result<UploadAccepted> {
        let url = format!("{}/upload", self.base_url);
        let part = Part::bytes(content)
            .file_name(file_name.into())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);
        let response = self.client.post(&url).multipart(form).send().await?;

        handle_response(response).await
    }

    /// Get the state of an ingestion job
    pub async fn upload_status(&self, job_id: &str) -> Result<UploadStatus> {
        let url = format!("{}/upload-status/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }
}
