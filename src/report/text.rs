//! Console rendering of a run report.

use std::fmt::Write as _;

use crate::core::RunReport;

/// Format nanoseconds as microseconds with two decimals.
pub fn format_micros(nanos: u64) -> String {
    format!("{:.2}", nanos as f64 / 1_000.0)
}

/// Render `report` as a plain-text table (durations in µs).
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "anoncreds-bench run {} ({})",
        report.record_id, report.timestamp
    );
    let _ = writeln!(
        out,
        "backend: {} (requested '{}')  engine: {}  iterations: {}  warmup: {}",
        report.backend_kind,
        report.config.backend_identifier,
        report.config.engine.as_deref().unwrap_or("-"),
        report.config.measured_iterations,
        report.config.warmup_iterations
    );
    out.push('\n');

    let _ = writeln!(
        out,
        "{:<14} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "operation", "count", "mean µs", "p50 µs", "p95 µs", "p99 µs", "min µs", "max µs"
    );
    let _ = writeln!(out, "{}", "-".repeat(14 + 7 + 13 * 6));
    for (operation, stats) in &report.summary {
        let _ = writeln!(
            out,
            "{:<14} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            operation.as_str(),
            stats.count,
            format_micros(stats.mean_nanos),
            format_micros(stats.p50_nanos),
            format_micros(stats.p95_nanos),
            format_micros(stats.p99_nanos),
            format_micros(stats.min_nanos),
            format_micros(stats.max_nanos),
        );
    }

    out.push('\n');
    if report.verification_mismatches.is_empty() {
        out.push_str("all proofs verified\n");
    } else {
        let _ = writeln!(
            out,
            "{} verification mismatch(es):",
            report.verification_mismatches.len()
        );
        for m in &report.verification_mismatches {
            let _ = writeln!(out, "  iteration {}: proof did not verify", m.iteration_index);
        }
    }
    out
}
