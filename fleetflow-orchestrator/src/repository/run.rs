//! Run Registry
//!
//! Process-lifetime table of pipeline runs keyed by run id. Runs are never
//! evicted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use fleetflow_core::domain::run::PipelineRun;

/// Storage of pipeline runs
///
/// `update` applies its closure while holding the registry's write lock, so
/// concurrent updates of the same run are serialized.
pub trait RunRepository: Send + Sync {
    fn get(&self, run_id: &str) -> Option<PipelineRun>;

    /// Insert or replace a run
    fn put(&self, run: PipelineRun);

    /// All runs, newest first
    fn list(&self) -> Vec<PipelineRun>;

    /// Mutate a run in place, returning the updated copy
    ///
    /// Returns `None` without calling `apply` if the run does not exist.
    fn update(&self, run_id: &str, apply: &mut dyn FnMut(&mut PipelineRun)) -> Option<PipelineRun>;
}

/// In-memory implementation of RunRepository
#[derive(Clone, Default)]
pub struct InMemoryRunRepository {
    runs: Arc<RwLock<HashMap<String, PipelineRun>>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunRepository for InMemoryRunRepository {
    fn get(&self, run_id: &str) -> Option<PipelineRun> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(run_id).cloned()
    }

    fn put(&self, run: PipelineRun) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        runs.insert(run.run_id.clone(), run);
    }

    fn list(&self) -> Vec<PipelineRun> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<PipelineRun> = runs.values().cloned().collect();
        list.sort_by(|a, b| {
            b.started_at
                .cmp(&a.started_at)
                .then_with(|| b.run_id.cmp(&a.run_id))
        });
        list
    }

    fn update(&self, run_id: &str, apply: &mut dyn FnMut(&mut PipelineRun)) -> Option<PipelineRun> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let run = runs.get_mut(run_id)?;
        apply(run);
        Some(run.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fleetflow_core::domain::run::RunStatus;

    #[test]
    fn test_put_and_get() {
        let repo = InMemoryRunRepository::new();
        repo.put(PipelineRun::start("run_a"));

        let run = repo.get("run_a").unwrap();
        assert_eq!(run.status, RunStatus::SimulationRunning);
        assert!(repo.get("run_b").is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let repo = InMemoryRunRepository::new();
        let mut older = PipelineRun::start("run_old");
        older.started_at -= Duration::seconds(10);
        repo.put(older);
        repo.put(PipelineRun::start("run_new"));

        let ids: Vec<String> = repo.list().into_iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec!["run_new", "run_old"]);
    }

    #[test]
    fn test_update() {
        let repo = InMemoryRunRepository::new();
        repo.put(PipelineRun::start("run_a"));

        let updated = repo
            .update("run_a", &mut |run| run.fail("simulation", "boom"))
            .unwrap();
        assert_eq!(updated.status, RunStatus::Failed);
        assert_eq!(repo.get("run_a").unwrap().status, RunStatus::Failed);

        let mut called = false;
        assert!(repo.update("missing", &mut |_| called = true).is_none());
        assert!(!called);
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let repo = InMemoryRunRepository::new();
        repo.put(PipelineRun::start("run_a"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                std::thread::spawn(move || {
                    repo.update("run_a", &mut |run| run.fail("test", format!("error {}", i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let run = repo.get("run_a").unwrap();
        assert_eq!(run.details.entries().len(), 8);
    }
}
