//! Client for the external stage services
//!
//! Each stage exposes `POST {base}/<stage>/start-from-file`. The call only
//! schedules work; the service reports completion later through a webhook.

use std::time::Duration;

use crate::error::Result;
use crate::handle_empty_response;
use fleetflow_core::domain::stage::Stage;
use fleetflow_core::dto::webhook::StageRequest;
use reqwest::Client;

/// HTTP client for the simulation, MOO and RL services
#[derive(Debug, Clone)]
pub struct StageClient {
    base_url: String,
    client: Client,
    simulation_timeout: Duration,
    stage_timeout: Duration,
}

impl StageClient {
    /// Create a client using each stage's default timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            simulation_timeout: Stage::Simulation.default_timeout(),
            stage_timeout: Stage::Moo.default_timeout(),
        }
    }

    /// Override the trigger timeouts (simulation, then MOO and RL)
    pub fn with_timeouts(mut self, simulation: Duration, stage: Duration) -> Self {
        self.simulation_timeout = simulation;
        self.stage_timeout = stage;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client-side timeout applied when triggering `stage`
    pub fn timeout_for(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Simulation => self.simulation_timeout,
            Stage::Moo | Stage::Rl => self.stage_timeout,
        }
    }

    pub fn stage_url(&self, stage: Stage) -> String {
        format!("{}/{}", self.base_url, stage.endpoint())
    }

    /// Ask a stage service to start processing a file
    ///
    /// Network errors, timeouts and non-2xx answers are all returned as errors.
    pub async fn start_stage(&self, stage: Stage, req: &StageRequest) -> Result<()> {
        let url = self.stage_url(stage);
        tracing::debug!("Triggering {} stage for run {} at {}", stage, req.run_id, url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout_for(stage))
            .json(req)
            .send()
            .await?;

        handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_urls() {
        let client = StageClient::new("http://fastapi:8000/");
        assert_eq!(
            client.stage_url(Stage::Simulation),
            "http://fastapi:8000/simulation/start-from-file"
        );
        assert_eq!(client.stage_url(Stage::Rl), "http://fastapi:8000/rl/start-from-file");
    }

    #[test]
    fn test_default_timeouts() {
        let client = StageClient::new("http://localhost:8000");
        assert_eq!(client.timeout_for(Stage::Simulation), Duration::from_secs(300));
        assert_eq!(client.timeout_for(Stage::Moo), Duration::from_secs(30));
        assert_eq!(client.timeout_for(Stage::Rl), Duration::from_secs(30));
    }

    #[test]
    fn test_custom_timeouts() {
        let client = StageClient::new("http://localhost:8000")
            .with_timeouts(Duration::from_secs(5), Duration::from_secs(2));
        assert_eq!(client.timeout_for(Stage::Simulation), Duration::from_secs(5));
        assert_eq!(client.timeout_for(Stage::Rl), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_error() {
        let client = StageClient::new("http://127.0.0.1:9")
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));
        let req = StageRequest {
            file_path: "/tmp/x.csv".to_string(),
            run_id: "run_1".to_string(),
            days_to_simulate: None,
        };
        assert!(client.start_stage(Stage::Moo, &req).await.is_err());
    }
}
