//! Storage layer for run reports.
//!
//! This module provides persistence for `RunReport` data in various formats.

pub mod csv;
pub mod jsonl;

// Re-export key types
pub use csv::{CSV_HEADERS, CsvExporter};
pub use jsonl::JsonlWriter;
