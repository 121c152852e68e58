//! Stage domain types
//!
//! A stage is one externally executed computation step of a run. Stages are
//! invoked by file-path handoff and report back through a webhook.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::run::RunStatus;

/// External computation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Simulation,
    Moo,
    Rl,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 3] = [Stage::Simulation, Stage::Moo, Stage::Rl];

    /// Detail key and log name of the stage
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Simulation => "simulation",
            Stage::Moo => "moo",
            Stage::Rl => "rl",
        }
    }

    /// Path of the stage service endpoint, relative to the service base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            Stage::Simulation => "simulation/start-from-file",
            Stage::Moo => "moo/start-from-file",
            Stage::Rl => "rl/start-from-file",
        }
    }

    /// Default client-side timeout for triggering this stage
    pub fn default_timeout(&self) -> Duration {
        match self {
            Stage::Simulation => Duration::from_secs(300),
            Stage::Moo | Stage::Rl => Duration::from_secs(30),
        }
    }

    /// Status a run holds while this stage is executing
    pub fn running_status(&self) -> RunStatus {
        match self {
            Stage::Simulation => RunStatus::SimulationRunning,
            Stage::Moo => RunStatus::MooRunning,
            Stage::Rl => RunStatus::RlRunning,
        }
    }

    /// Stage that follows this one, if any
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Simulation => Some(Stage::Moo),
            Stage::Moo => Some(Stage::Rl),
            Stage::Rl => None,
        }
    }

    /// Error stage label recorded when the outbound trigger call fails
    pub fn trigger_error_label(&self) -> &'static str {
        match self {
            Stage::Simulation => "simulation_trigger",
            Stage::Moo => "moo_trigger",
            Stage::Rl => "rl_trigger",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulation" | "sim" => Ok(Stage::Simulation),
            "moo" => Ok(Stage::Moo),
            "rl" => Ok(Stage::Rl),
            other => Err(format!("unknown stage '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::Simulation.next(), Some(Stage::Moo));
        assert_eq!(Stage::Moo.next(), Some(Stage::Rl));
        assert_eq!(Stage::Rl.next(), None);
    }

    #[test]
    fn test_stage_timeouts() {
        assert_eq!(Stage::Simulation.default_timeout(), Duration::from_secs(300));
        assert_eq!(Stage::Moo.default_timeout(), Duration::from_secs(30));
        assert_eq!(Stage::Rl.default_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_stage_from_str() {
        assert_eq!("MOO".parse::<Stage>(), Ok(Stage::Moo));
        assert_eq!("simulation".parse::<Stage>(), Ok(Stage::Simulation));
        assert!("training".parse::<Stage>().is_err());
    }
}
