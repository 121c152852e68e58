//! Upload job registry
//!
//! Pollable state of CSV ingestion jobs, keyed by job id.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use fleetflow_core::dto::upload::{UploadResults, UploadState, UploadStatus};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct UploadRegistry {
    jobs: Arc<RwLock<HashMap<String, UploadStatus>>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh id for a user upload
    pub fn new_job_id() -> String {
        format!("upload_{}", Uuid::new_v4().simple())
    }

    /// Register a job in the `processing` state, replacing any previous entry
    pub fn create(&self, job_id: &str, message: impl Into<String>) {
        self.write().insert(job_id.to_string(), UploadStatus::processing(message));
    }

    pub fn get(&self, job_id: &str) -> Option<UploadStatus> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()
    }

    pub fn set_progress(&self, job_id: &str, progress: u8, message: impl Into<String>) {
        if let Some(job) = self.write().get_mut(job_id) {
            job.progress = Some(progress.min(100));
            job.message = Some(message.into());
        }
    }

    /// Attach intermediate results (e.g. the parsed preview) to a running job
    pub fn set_results(&self, job_id: &str, results: UploadResults) {
        if let Some(job) = self.write().get_mut(job_id) {
            job.results = Some(results);
        }
    }

    pub fn complete(&self, job_id: &str, results: UploadResults) -> UploadStatus {
        let status = UploadStatus {
            status: UploadState::Completed,
            progress: Some(100),
            message: Some("CSV processing completed successfully".to_string()),
            results: Some(results),
        };
        self.write().insert(job_id.to_string(), status.clone());
        status
    }

    pub fn fail(&self, job_id: &str, message: impl Into<String>) -> UploadStatus {
        let status = UploadStatus {
            status: UploadState::Failed,
            progress: None,
            message: Some(message.into()),
            results: None,
        };
        self.write().insert(job_id.to_string(), status.clone());
        status
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, UploadStatus>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let registry = UploadRegistry::new();
        registry.create("job1", "File uploaded, processing started");

        let job = registry.get("job1").unwrap();
        assert_eq!(job.status, UploadState::Processing);
        assert_eq!(job.progress, Some(0));

        registry.set_progress("job1", 40, "Parsed 3 rows from CSV");
        assert_eq!(registry.get("job1").unwrap().progress, Some(40));

        let done = registry.complete("job1", UploadResults::default());
        assert!(done.is_completed());
        assert_eq!(registry.get("job1").unwrap().progress, Some(100));
    }

    #[test]
    fn test_fail_and_unknown_job() {
        let registry = UploadRegistry::new();
        registry.set_progress("ghost", 10, "ignored");
        assert!(registry.get("ghost").is_none());

        registry.create("job1", "processing");
        let failed = registry.fail("job1", "CSV input has no header row");
        assert_eq!(failed.status, UploadState::Failed);
        assert_eq!(
            registry.get("job1").unwrap().message.as_deref(),
            Some("CSV input has no header row")
        );
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(UploadRegistry::new_job_id(), UploadRegistry::new_job_id());
    }
}
