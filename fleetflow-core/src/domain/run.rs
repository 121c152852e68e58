//! Pipeline run domain types
//!
//! A run moves through `simulation_running -> moo_running -> rl_running -> completed`,
//! with `failed` reachable from any non-terminal state. The run's details are an
//! append-only audit trail: every transition pushes a new entry and never removes one.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::stage::Stage;

/// Pipeline run execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    SimulationRunning,
    MooRunning,
    RlRunning,
    Completed,
    Failed,
}

impl RunStatus {
    /// Terminal runs accept no further webhook transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::SimulationRunning => "simulation_running",
            RunStatus::MooRunning => "moo_running",
            RunStatus::RlRunning => "rl_running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a stage as reported by its webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Completed,
    Failed,
}

/// Metadata recorded when a stage webhook is received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutcome {
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub stage: StageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Failure recorded against a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub stage: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry in a run's audit trail
#[derive(Debug, Clone, PartialEq)]
pub enum StageDetail {
    Simulation(StageOutcome),
    Moo(StageOutcome),
    Rl(StageOutcome),
    Error(ErrorDetail),
}

impl StageDetail {
    fn for_stage(stage: Stage, outcome: StageOutcome) -> Self {
        match stage {
            Stage::Simulation => StageDetail::Simulation(outcome),
            Stage::Moo => StageDetail::Moo(outcome),
            Stage::Rl => StageDetail::Rl(outcome),
        }
    }

    /// Key under which this entry appears in the serialized details map
    pub fn key(&self) -> &'static str {
        match self {
            StageDetail::Simulation(_) => "simulation",
            StageDetail::Moo(_) => "moo",
            StageDetail::Rl(_) => "rl",
            StageDetail::Error(_) => "error",
        }
    }

    pub fn outcome(&self) -> Option<&StageOutcome> {
        match self {
            StageDetail::Simulation(o) | StageDetail::Moo(o) | StageDetail::Rl(o) => Some(o),
            StageDetail::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        match self {
            StageDetail::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Append-only audit trail of a run
///
/// Serializes as a map from detail key to the most recent entry with that key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunDetails {
    entries: Vec<StageDetail>,
}

impl RunDetails {
    pub fn push(&mut self, detail: StageDetail) {
        self.entries.push(detail);
    }

    /// All entries in the order they were recorded
    pub fn entries(&self) -> &[StageDetail] {
        &self.entries
    }

    /// Most recent entry recorded under `key`
    pub fn latest(&self, key: &str) -> Option<&StageDetail> {
        self.entries.iter().rev().find(|e| e.key() == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.latest(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RunDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let latest: BTreeMap<&'static str, &StageDetail> =
            self.entries.iter().map(|e| (e.key(), e)).collect();

        let mut map = serializer.serialize_map(Some(latest.len()))?;
        for (key, detail) in latest {
            match detail {
                StageDetail::Simulation(o) | StageDetail::Moo(o) | StageDetail::Rl(o) => {
                    map.serialize_entry(key, o)?
                }
                StageDetail::Error(e) => map.serialize_entry(key, e)?,
            }
        }
        map.end()
    }
}

/// One end-to-end execution of the simulate -> optimize -> learn sequence
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub details: RunDetails,
}

impl PipelineRun {
    /// Create a run that is already waiting on the simulation stage
    pub fn start(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            status: RunStatus::SimulationRunning,
            details: RunDetails::default(),
        }
    }

    /// Record a successful stage webhook and move to the next status
    ///
    /// Returns the stage that must be triggered next, if any.
    pub fn complete_stage(&mut self, stage: Stage, file_path: impl Into<String>) -> Option<Stage> {
        let now = Utc::now();
        let next = stage.next();

        let outcome = StageOutcome {
            received_at: now,
            file_path: Some(file_path.into()),
            stage: StageState::Completed,
            error: None,
            completed_at: next.is_none().then_some(now),
        };
        self.details.push(StageDetail::for_stage(stage, outcome));

        self.status = match next {
            Some(next_stage) => next_stage.running_status(),
            None => RunStatus::Completed,
        };

        next
    }

    /// Record a stage webhook that reported failure and fail the run
    pub fn fail_stage(&mut self, stage: Stage, file_path: Option<String>, error: impl Into<String>) {
        let error = error.into();
        let outcome = StageOutcome {
            received_at: Utc::now(),
            file_path,
            stage: StageState::Failed,
            error: Some(error.clone()),
            completed_at: None,
        };
        self.details.push(StageDetail::for_stage(stage, outcome));
        self.fail(stage.as_str(), error);
    }

    /// Mark the run failed and append an error entry
    pub fn fail(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.details.push(StageDetail::Error(ErrorDetail {
            stage: stage.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }));
    }

    /// Most recent error recorded against the run
    pub fn last_error(&self) -> Option<&ErrorDetail> {
        self.details.latest("error").and_then(StageDetail::error)
    }
}

/// Generate a run id of the form `run_<unix millis>_<6 base36 chars>`
pub fn generate_run_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut seed = Uuid::new_v4().as_u128();
    let suffix: String = (0..6)
        .map(|_| {
            let c = ALPHABET[(seed % 36) as usize] as char;
            seed /= 36;
            c
        })
        .collect();

    format!("run_{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_simulation_running() {
        let run = PipelineRun::start("run_1");
        assert_eq!(run.status, RunStatus::SimulationRunning);
        assert!(run.details.is_empty());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut run = PipelineRun::start("run_1");

        assert_eq!(run.complete_stage(Stage::Simulation, "/s/sim.csv"), Some(Stage::Moo));
        assert_eq!(run.status, RunStatus::MooRunning);

        assert_eq!(run.complete_stage(Stage::Moo, "/s/moo.csv"), Some(Stage::Rl));
        assert_eq!(run.status, RunStatus::RlRunning);

        assert_eq!(run.complete_stage(Stage::Rl, "/s/rl.csv"), None);
        assert_eq!(run.status, RunStatus::Completed);

        let rl = run.details.latest("rl").and_then(StageDetail::outcome).unwrap();
        assert!(rl.completed_at.is_some());
    }

    #[test]
    fn test_details_are_append_only() {
        let mut run = PipelineRun::start("run_1");
        run.complete_stage(Stage::Simulation, "/s/sim.csv");
        run.complete_stage(Stage::Moo, "/s/moo.csv");
        run.fail("rl_trigger", "connection refused");

        assert!(run.details.contains_key("simulation"));
        assert!(run.details.contains_key("moo"));
        assert!(run.details.contains_key("error"));
        assert_eq!(run.details.entries().len(), 3);
    }

    #[test]
    fn test_fail_stage_records_stage_error() {
        let mut run = PipelineRun::start("run_1");
        run.fail_stage(Stage::Simulation, None, "solver diverged");

        assert_eq!(run.status, RunStatus::Failed);
        let sim = run.details.latest("simulation").and_then(StageDetail::outcome).unwrap();
        assert_eq!(sim.stage, StageState::Failed);
        assert_eq!(sim.error.as_deref(), Some("solver diverged"));
        assert_eq!(run.last_error().unwrap().stage, "simulation");
    }

    #[test]
    fn test_details_serialize_as_latest_per_key() {
        let mut run = PipelineRun::start("run_1");
        run.fail("first", "a");
        run.fail("second", "b");

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["details"]["error"]["stage"], "second");
        assert!(value["runId"].is_string());
        assert!(value["startedAt"].is_string());
    }

    #[test]
    fn test_status_serialization() {
        let value = serde_json::to_value(RunStatus::SimulationRunning).unwrap();
        assert_eq!(value, "simulation_running");
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::RlRunning.is_terminal());
    }

    #[test]
    fn test_generate_run_id_shape() {
        let id = generate_run_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "run");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 6);
        assert_ne!(generate_run_id(), id);
    }
}
