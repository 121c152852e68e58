//! Stage dispatch queue
//!
//! Webhook handlers never wait on the next stage's trigger call. They enqueue
//! a [`StageTrigger`] and return; the [`StageWorker`] performs the call and
//! records any failure on the run.

use std::sync::Arc;

use fleetflow_core::domain::stage::Stage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::service::pipeline::PipelineService;

/// Pending outbound call to a stage service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrigger {
    pub run_id: String,
    pub stage: Stage,
    pub file_path: String,
    pub days_to_simulate: Option<u32>,
}

/// Sending half, held by the orchestrator
#[derive(Clone)]
pub struct StageQueue {
    tx: mpsc::UnboundedSender<StageTrigger>,
}

impl StageQueue {
    /// Queue a trigger, handing it back if no worker is listening
    pub fn enqueue(&self, trigger: StageTrigger) -> Result<(), StageTrigger> {
        self.tx.send(trigger).map_err(|e| e.0)
    }
}

/// Receiving half, which performs the queued triggers
pub struct StageWorker {
    rx: mpsc::UnboundedReceiver<StageTrigger>,
}

pub fn stage_queue() -> (StageQueue, StageWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StageQueue { tx }, StageWorker { rx })
}

impl StageWorker {
    /// Consume triggers until every queue handle is dropped, one task per trigger
    pub fn spawn(mut self, pipeline: Arc<PipelineService>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(trigger) = self.rx.recv().await {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    if let Err(e) = pipeline.trigger_stage(trigger).await {
                        tracing::debug!("Queued stage trigger failed: {}", e);
                    }
                });
            }
            tracing::debug!("Stage queue closed, worker exiting");
        })
    }

    /// Run every currently queued trigger to completion, in order
    ///
    /// Returns the number of triggers performed.
    pub async fn drain(&mut self, pipeline: &PipelineService) -> usize {
        let mut performed = 0;
        while let Ok(trigger) = self.rx.try_recv() {
            if let Err(e) = pipeline.trigger_stage(trigger).await {
                tracing::debug!("Queued stage trigger failed: {}", e);
            }
            performed += 1;
        }
        performed
    }
}
