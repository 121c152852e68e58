//! Fleetflow Core
//!
//! Core types and abstractions for the Fleetflow pipeline engine.
//!
//! This crate contains:
//! - Domain types: pipeline runs, stages, train profile records, storage files
//! - DTOs: request/response bodies shared by the orchestrator, client and CLI
//! - Normalization: tolerant CSV parsing and header/value canonicalization

pub mod domain;
pub mod dto;
pub mod normalize;
