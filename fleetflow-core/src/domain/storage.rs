//! Shared storage layout
//!
//! The engine and the external stage services exchange files through a shared
//! directory tree. File names derived here are the handoff contract: stage
//! services read and write exactly these names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical storage area under the shared root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    Input,
    Output,
    Temp,
}

impl StorageArea {
    pub const ALL: [StorageArea; 3] = [StorageArea::Input, StorageArea::Output, StorageArea::Temp];

    /// Subdirectory name under the storage root
    pub fn dir_name(&self) -> &'static str {
        match self {
            StorageArea::Input => "input",
            StorageArea::Output => "output",
            StorageArea::Temp => "temp",
        }
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A file whose name is derived from a run or upload id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageFile {
    UserUpload(String),
    SimulationResult(String),
    MooResult(String),
    RlFinal(String),
}

impl StorageFile {
    pub fn file_name(&self) -> String {
        match self {
            StorageFile::UserUpload(id) => format!("user_upload_{}.csv", id),
            StorageFile::SimulationResult(id) => format!("simulation_result_{}.csv", id),
            StorageFile::MooResult(id) => format!("moo_result_{}.csv", id),
            StorageFile::RlFinal(id) => format!("rl_final_{}.csv", id),
        }
    }

    /// Area the file lives in
    pub fn area(&self) -> StorageArea {
        match self {
            StorageFile::UserUpload(_) => StorageArea::Input,
            StorageFile::SimulationResult(_) | StorageFile::MooResult(_) | StorageFile::RlFinal(_) => {
                StorageArea::Output
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let id = "run_1_abc123".to_string();
        assert_eq!(
            StorageFile::UserUpload(id.clone()).file_name(),
            "user_upload_run_1_abc123.csv"
        );
        assert_eq!(
            StorageFile::SimulationResult(id.clone()).file_name(),
            "simulation_result_run_1_abc123.csv"
        );
        assert_eq!(
            StorageFile::MooResult(id.clone()).file_name(),
            "moo_result_run_1_abc123.csv"
        );
        assert_eq!(StorageFile::RlFinal(id).file_name(), "rl_final_run_1_abc123.csv");
    }

    #[test]
    fn test_file_areas() {
        assert_eq!(StorageFile::UserUpload("x".into()).area(), StorageArea::Input);
        assert_eq!(StorageFile::RlFinal("x".into()).area(), StorageArea::Output);
    }
}
