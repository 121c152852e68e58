//! Core domain types
//!
//! This module contains the core domain structures used across Fleetflow services.
//! Runs and stages are owned by the orchestrator; train profile records describe
//! the rows the record upserter writes into the persistent store.

pub mod run;
pub mod stage;
pub mod storage;
pub mod train;
