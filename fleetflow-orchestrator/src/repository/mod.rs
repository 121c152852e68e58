//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Runs live in memory for the life of the process; train profiles go to
//! Postgres when configured.

pub mod run;
pub mod train;

// Re-export for convenience
pub use run as run_repository;
pub use train as train_repository;
