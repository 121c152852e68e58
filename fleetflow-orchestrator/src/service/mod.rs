//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services coordinate repositories, shared storage and the stage services.

pub mod announcer;
pub mod dispatch;
pub mod ingest;
pub mod pipeline;
pub mod stage;
pub mod upload;

// Re-export for convenience
pub use ingest as ingest_service;
pub use pipeline as pipeline_service;
pub use upload as upload_service;
