//! Event Announcer
//!
//! Single-subscriber broadcast of run-state changes. A new subscriber replaces
//! the previous one; with no subscriber, announcements are dropped.

use std::sync::{Arc, Mutex, PoisonError};

use fleetflow_core::domain::run::RunStatus;
use serde::Serialize;
use tokio::sync::mpsc;

/// Change pushed to the subscriber
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum PipelineEvent {
    Pipeline {
        run_id: String,
        status: RunStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    DataReady {
        run_id: String,
        job_id: String,
    },
}

impl PipelineEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Pipeline { .. } => "pipeline",
            PipelineEvent::DataReady { .. } => "data-ready",
        }
    }
}

#[derive(Clone, Default)]
pub struct EventAnnouncer {
    subscriber: Arc<Mutex<Option<mpsc::UnboundedSender<PipelineEvent>>>>,
}

impl EventAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new subscriber, dropping the previous one
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slot = self.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.replace(tx).is_some() {
            tracing::debug!("Replacing previous event subscriber");
        }
        rx
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn announce(&self, event: PipelineEvent) {
        let mut slot = self.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = slot.as_ref() else {
            return;
        };

        if tx.send(event).is_err() {
            tracing::debug!("Event subscriber went away");
            *slot = None;
        }
    }
}
