//! CSV export for run reports.

use std::io::Write;
use std::path::Path;

use crate::BenchError;
use crate::core::schema::{Operation, RunReport, Stats};

/// CSV column headers in deterministic order.
pub const CSV_HEADERS: &[&str] = &[
    "schema_version",
    "record_id",
    "timestamp",
    "backend_kind",
    "backend_identifier",
    "engine",
    "git_sha",
    "warmup",
    "iterations",
    "operation",
    "count",
    "total_ns",
    "mean_ns",
    "p50_ns",
    "p95_ns",
    "p99_ns",
    "min_ns",
    "max_ns",
    "verification_mismatches",
];

/// CSV exporter for run reports.
///
/// Flattens each report into one row per summarized operation, in operation
/// order, so rows from different runs line up column for column.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Export reports to a CSV file, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns an error if file operations or CSV writing fails.
    pub fn export(&self, reports: &[RunReport], output: &Path) -> Result<(), BenchError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| BenchError::Message(format!("failed to create file: {e}")))?;

        self.export_to_writer(reports, file)
    }

    pub fn export_to_stdout(&self, reports: &[RunReport]) -> Result<(), BenchError> {
        let stdout = std::io::stdout();
        let handle = stdout.lock();
        self.export_to_writer(reports, handle)
    }

    pub fn export_to_writer<W: Write>(
        &self,
        reports: &[RunReport],
        writer: W,
    ) -> Result<(), BenchError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(CSV_HEADERS)
            .map_err(|e| BenchError::Message(format!("failed to write CSV headers: {e}")))?;

        for report in reports {
            for (operation, stats) in &report.summary {
                let row = self.row(report, *operation, stats);
                csv_writer
                    .write_record(&row)
                    .map_err(|e| BenchError::Message(format!("failed to write CSV row: {e}")))?;
            }
        }

        csv_writer
            .flush()
            .map_err(|e| BenchError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }

    fn row(&self, report: &RunReport, operation: Operation, stats: &Stats) -> Vec<String> {
        vec![
            report.schema_version.to_string(),
            report.record_id.clone(),
            report.timestamp.clone(),
            report.backend_kind.to_string(),
            report.config.backend_identifier.clone(),
            report.config.engine.clone().unwrap_or_default(),
            report.env.git_sha.clone().unwrap_or_default(),
            report.config.warmup_iterations.to_string(),
            report.config.measured_iterations.to_string(),
            operation.to_string(),
            stats.count.to_string(),
            stats.total_nanos.to_string(),
            stats.mean_nanos.to_string(),
            stats.p50_nanos.to_string(),
            stats.p95_nanos.to_string(),
            stats.p99_nanos.to_string(),
            stats.min_nanos.to_string(),
            stats.max_nanos.to_string(),
            report.verification_mismatches.len().to_string(),
        ]
    }
}
