//! Data Transfer Objects for inter-service communication
//!
//! This module contains the request and response bodies exchanged between the
//! orchestrator, its clients and the external stage services. Field names follow
//! the JSON contract (camelCase, with the stage services' snake_case keys kept as-is).

pub mod pipeline;
pub mod upload;
pub mod webhook;
