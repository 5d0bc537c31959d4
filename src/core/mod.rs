//! Core types and schemas for anoncreds-bench.
//!
//! This module contains the canonical `RunReport` schema (v1) used for all benchmark outputs.

pub mod env;
pub mod schema;

// Re-export key types for convenience
pub use env::EnvironmentInfo;
pub use schema::{
    Operation, RunConfig, RunReport, SCHEMA_VERSION, Sample, Stats, VerificationMismatch,
};
