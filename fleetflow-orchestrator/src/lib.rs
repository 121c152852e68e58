//! Fleetflow Orchestrator
//!
//! Pipeline orchestration and data-ingestion engine. Runs are driven through
//! the external simulation, MOO and RL services by file handoff over shared
//! storage, and the final result is ingested into the train store.

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod storage;

use std::sync::Arc;

use crate::api::AppState;
use crate::config::Config;
use crate::repository::run::InMemoryRunRepository;
use crate::repository::train::TrainStore;
use crate::service::announcer::EventAnnouncer;
use crate::service::dispatch::{StageWorker, stage_queue};
use crate::service::ingest::Ingestor;
use crate::service::pipeline::{PipelineService, PipelineSettings};
use crate::service::stage::StageService;
use crate::service::upload::UploadRegistry;
use crate::storage::StorageGateway;

/// Wire the services together
///
/// The returned worker must be spawned (or drained) for queued stage triggers
/// to be performed.
pub fn build_state(
    config: &Config,
    storage: StorageGateway,
    trains: Arc<dyn TrainStore>,
    stages: Arc<dyn StageService>,
) -> (AppState, StageWorker) {
    let announcer = EventAnnouncer::new();
    let ingestor = Arc::new(Ingestor::new(trains, UploadRegistry::new()));
    let (queue, worker) = stage_queue();

    let pipeline = PipelineService::new(
        Arc::new(InMemoryRunRepository::new()),
        storage.clone(),
        stages,
        queue,
        Arc::clone(&ingestor),
        announcer.clone(),
        PipelineSettings {
            default_days_to_simulate: config.default_days_to_simulate,
            update_database_on_completion: config.update_database_on_completion,
        },
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        ingestor,
        storage,
        announcer,
        max_upload_bytes: config.max_upload_bytes,
    };
    (state, worker)
}
