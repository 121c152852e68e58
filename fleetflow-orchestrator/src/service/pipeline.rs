//! Pipeline Orchestrator
//!
//! Drives a run through simulation, MOO and RL. Starting a run persists its
//! input and triggers the simulation service directly; every later trigger is
//! queued by a stage webhook and performed by the [`StageWorker`].
//!
//! [`StageWorker`]: crate::service::dispatch::StageWorker

use std::sync::Arc;

use chrono::Utc;
use fleetflow_client::ClientError;
use fleetflow_core::domain::run::{PipelineRun, RunStatus, generate_run_id};
use fleetflow_core::domain::stage::Stage;
use fleetflow_core::domain::storage::StorageFile;
use fleetflow_core::dto::pipeline::{StartMetadata, StartPipeline, StartPipelineResponse};
use fleetflow_core::dto::webhook::{StageRequest, WebhookPayload};
use fleetflow_core::normalize::{CsvError, trains_to_csv};
use thiserror::Error;

use crate::repository::run::RunRepository;
use crate::service::announcer::{EventAnnouncer, PipelineEvent};
use crate::service::dispatch::{StageQueue, StageTrigger};
use crate::service::ingest::Ingestor;
use crate::service::stage::StageService;
use crate::storage::{StorageError, StorageGateway};

/// Error stage label for failures after the RL webhook
pub const RL_COMPLETION: &str = "rl_completion";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("Pipeline run not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to convert trains to CSV: {0}")]
    Csv(#[from] CsvError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_days_to_simulate: u32,
    /// Ingest the RL result into the train store when a run completes
    pub update_database_on_completion: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_days_to_simulate: 1,
            update_database_on_completion: true,
        }
    }
}

/// What a webhook did to its run
enum Transition {
    Ignored(RunStatus),
    Failed(String),
    Advanced { next: Option<Stage>, file_path: String },
}

pub struct PipelineService {
    runs: Arc<dyn RunRepository>,
    storage: StorageGateway,
    stages: Arc<dyn StageService>,
    queue: StageQueue,
    ingestor: Arc<Ingestor>,
    announcer: EventAnnouncer,
    settings: PipelineSettings,
}

impl PipelineService {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        storage: StorageGateway,
        stages: Arc<dyn StageService>,
        queue: StageQueue,
        ingestor: Arc<Ingestor>,
        announcer: EventAnnouncer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            runs,
            storage,
            stages,
            queue,
            ingestor,
            announcer,
            settings,
        }
    }

    pub fn get(&self, run_id: &str) -> Result<PipelineRun> {
        self.runs
            .get(run_id)
            .ok_or_else(|| PipelineError::NotFound(run_id.to_string()))
    }

    /// All runs, newest first
    pub fn list(&self) -> Vec<PipelineRun> {
        self.runs.list()
    }

    /// Start a run from JSON train data
    pub async fn start_from_trains(&self, req: StartPipeline) -> Result<StartPipelineResponse> {
        validate_trains(&req)?;

        let csv = trains_to_csv(&req.trains)?;
        let days = req
            .days_to_simulate
            .unwrap_or(self.settings.default_days_to_simulate);

        self.launch(
            csv.as_bytes(),
            req.trains.len(),
            days,
            None,
            "Pipeline started successfully",
        )
        .await
    }

    /// Start a run from an uploaded CSV file, stored as-is
    pub async fn start_from_csv(
        &self,
        original_filename: Option<String>,
        data: &[u8],
        days_to_simulate: Option<u32>,
    ) -> Result<StartPipelineResponse> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(PipelineError::Validation(
                "Uploaded CSV file is empty".to_string(),
            ));
        }

        let trains = String::from_utf8_lossy(data)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count()
            .saturating_sub(1);
        let days = days_to_simulate.unwrap_or(self.settings.default_days_to_simulate);

        self.launch(
            data,
            trains,
            days,
            Some((original_filename, data.len())),
            "Pipeline started successfully with CSV data",
        )
        .await
    }

    async fn launch(
        &self,
        content: &[u8],
        trains_processed: usize,
        days_to_simulate: u32,
        upload: Option<(Option<String>, usize)>,
        message: &str,
    ) -> Result<StartPipelineResponse> {
        let run_id = generate_run_id();

        // Input is persisted first so a storage failure leaves no run behind
        let path = self
            .storage
            .save(&StorageFile::UserUpload(run_id.clone()), content)
            .await?;
        let file_path = path.to_string_lossy().into_owned();

        let run = PipelineRun::start(&run_id);
        tracing::info!("Pipeline run {} started: {}", run_id, run.status);
        self.announce_run(&run);
        self.runs.put(run);

        let trigger = StageTrigger {
            run_id: run_id.clone(),
            stage: Stage::Simulation,
            file_path: file_path.clone(),
            days_to_simulate: Some(days_to_simulate),
        };
        let message = match self.trigger_stage(trigger).await {
            Ok(()) => message.to_string(),
            Err(e) => format!("Pipeline started but simulation trigger failed: {}", e),
        };

        let status = self.get(&run_id)?.status;
        let (original_filename, file_size) = match upload {
            Some((name, size)) => (name, Some(size)),
            None => (None, None),
        };

        Ok(StartPipelineResponse {
            success: status != RunStatus::Failed,
            message,
            run_id,
            file_path,
            status,
            trains_processed,
            metadata: StartMetadata {
                days_to_simulate,
                uploaded_at: Utc::now(),
                original_filename,
                file_size,
            },
        })
    }

    /// Call a stage service, failing the run if the call does not succeed
    pub async fn trigger_stage(&self, trigger: StageTrigger) -> std::result::Result<(), ClientError> {
        let req = StageRequest {
            file_path: trigger.file_path.clone(),
            run_id: trigger.run_id.clone(),
            days_to_simulate: trigger.days_to_simulate,
        };

        match self.stages.start_stage(trigger.stage, &req).await {
            Ok(()) => {
                tracing::info!("Triggered {} stage for run {}", trigger.stage, trigger.run_id);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "Failed to trigger {} stage for run {}: {}",
                    trigger.stage,
                    trigger.run_id,
                    e
                );
                self.fail_run(
                    &trigger.run_id,
                    trigger.stage.trigger_error_label(),
                    e.to_string(),
                );
                Err(e)
            }
        }
    }

    /// Apply a stage completion webhook
    ///
    /// Returns the run as it stands afterwards, or `None` for an unknown run id.
    pub async fn on_stage_finished(
        &self,
        stage: Stage,
        payload: WebhookPayload,
    ) -> Result<Option<PipelineRun>> {
        let run_id = payload
            .run_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PipelineError::Validation("runId required".to_string()))?
            .to_string();

        tracing::info!(
            "{} finished webhook received for run {} (success: {})",
            stage,
            run_id,
            payload.success
        );

        let mut transition = Transition::Ignored(RunStatus::Idle);
        let Some(run) = self.runs.update(&run_id, &mut |run| {
            transition = apply_webhook(run, stage, &payload);
        }) else {
            tracing::warn!("{} webhook for unknown run {}", stage, run_id);
            return Ok(None);
        };

        match transition {
            Transition::Ignored(status) => {
                tracing::warn!(
                    "Ignoring {} webhook for run {} already {}",
                    stage,
                    run_id,
                    status
                );
            }
            Transition::Failed(error) => {
                tracing::error!("Run {} failed in {} stage: {}", run_id, stage, error);
                self.announce_run(&run);
            }
            Transition::Advanced {
                next: Some(next),
                file_path,
            } => {
                tracing::info!("Run {} advanced to {}", run_id, run.status);
                self.announce_run(&run);
                self.dispatch(StageTrigger {
                    run_id: run_id.clone(),
                    stage: next,
                    file_path,
                    days_to_simulate: None,
                });
            }
            Transition::Advanced {
                next: None,
                file_path,
            } => {
                tracing::info!("Run {} completed, result at {}", run_id, file_path);
                self.announce_run(&run);
                self.finish_run(&run_id, &file_path).await;
            }
        }

        Ok(self.runs.get(&run_id))
    }

    fn dispatch(&self, trigger: StageTrigger) {
        if let Err(trigger) = self.queue.enqueue(trigger) {
            tracing::error!(
                "Stage worker is not running, cannot trigger {} for run {}",
                trigger.stage,
                trigger.run_id
            );
            self.fail_run(
                &trigger.run_id,
                trigger.stage.trigger_error_label(),
                "stage dispatcher is not running",
            );
        }
    }

    /// Verify and ingest the RL result of a completed run
    async fn finish_run(&self, run_id: &str, file_path: &str) {
        if !self.storage.exists(file_path).await {
            self.fail_run(
                run_id,
                RL_COMPLETION,
                format!("RL result file not found: {}", file_path),
            );
            return;
        }

        if !self.settings.update_database_on_completion {
            tracing::info!("Skipping result ingestion for run {}", run_id);
            return;
        }

        let job_id = format!("rl_{}", run_id);
        let uploads = self.ingestor.uploads();
        uploads.create(&job_id, "RL result ingestion started");

        let data = match self.storage.read(file_path).await {
            Ok(data) => data,
            Err(e) => {
                uploads.fail(&job_id, e.to_string());
                self.fail_run(run_id, RL_COMPLETION, e.to_string());
                return;
            }
        };

        let status = self.ingestor.run_job(&job_id, &data).await;
        if !status.is_completed() {
            let message = status
                .message
                .unwrap_or_else(|| "CSV ingestion failed".to_string());
            self.fail_run(run_id, RL_COMPLETION, message);
            return;
        }

        self.announcer.announce(PipelineEvent::DataReady {
            run_id: run_id.to_string(),
            job_id,
        });
    }

    /// Mark a run failed unless it already is
    pub fn fail_run(
        &self,
        run_id: &str,
        stage: &str,
        message: impl Into<String>,
    ) -> Option<PipelineRun> {
        let message = message.into();
        let mut changed = false;

        let run = self.runs.update(run_id, &mut |run| {
            if run.status != RunStatus::Failed {
                run.fail(stage, message.clone());
                changed = true;
            }
        })?;

        if changed {
            tracing::error!("Run {} failed at {}: {}", run_id, stage, message);
            self.announce_run(&run);
        }
        Some(run)
    }

    fn announce_run(&self, run: &PipelineRun) {
        let error = match run.status {
            RunStatus::Failed => run.last_error().map(|e| e.message.clone()),
            _ => None,
        };
        self.announcer.announce(PipelineEvent::Pipeline {
            run_id: run.run_id.clone(),
            status: run.status,
            error,
        });
    }
}

fn validate_trains(req: &StartPipeline) -> Result<()> {
    if req.trains.is_empty() {
        return Err(PipelineError::Validation(
            "Invalid request: trains array is required and must contain at least one train"
                .to_string(),
        ));
    }

    if let Some(index) = req
        .trains
        .iter()
        .position(|t| t.train_id.trim().is_empty() || t.status.trim().is_empty())
    {
        return Err(PipelineError::Validation(format!(
            "Invalid train data: trainId and status are required fields (train at index {})",
            index
        )));
    }

    Ok(())
}

fn apply_webhook(run: &mut PipelineRun, stage: Stage, payload: &WebhookPayload) -> Transition {
    if run.status.is_terminal() {
        return Transition::Ignored(run.status);
    }

    let file_path = payload
        .file_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    match file_path {
        Some(path) if payload.success => Transition::Advanced {
            next: run.complete_stage(stage, path),
            file_path: path.to_string(),
        },
        _ => {
            let error = payload.error.clone().unwrap_or_else(|| {
                if payload.success {
                    format!("{} webhook did not include a filePath", stage)
                } else {
                    format!("{} stage reported failure", stage)
                }
            });
            run.fail_stage(stage, file_path.map(str::to_string), error.clone());
            Transition::Failed(error)
        }
    }
}
