//! Reporting: sample aggregation and console rendering.
//!
//! This module provides:
//! - `summarize`: reduction of loop samples into a `RunReport`
//! - `render_text`: a console table of per-operation stats

pub mod aggregate;
pub mod text;

// Re-export key types
pub use aggregate::{percentile_nearest_rank, stats_from_durations, summarize, summarize_samples};
pub use text::{format_micros, render_text};
