//! Stage service seam
//!
//! The orchestrator only needs to ask a stage to start; the HTTP client is the
//! production implementation.

use async_trait::async_trait;
use fleetflow_client::StageClient;
use fleetflow_core::domain::stage::Stage;
use fleetflow_core::dto::webhook::StageRequest;

/// Trigger for the external simulation, MOO and RL services
#[async_trait]
pub trait StageService: Send + Sync {
    async fn start_stage(&self, stage: Stage, req: &StageRequest) -> fleetflow_client::Result<()>;
}

#[async_trait]
impl StageService for StageClient {
    async fn start_stage(&self, stage: Stage, req: &StageRequest) -> fleetflow_client::Result<()> {
        StageClient::start_stage(self, stage, req).await
    }
}
