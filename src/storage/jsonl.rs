//! JSONL (JSON Lines) storage for run reports.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::BenchError;
use crate::backend::BackendKind;
use crate::core::schema::{RunReport, SCHEMA_VERSION};

/// JSONL writer/reader for run reports.
///
/// One report per line, so runs can be appended without rewriting the file.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    /// The file is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonlWriter {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one report.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The report's schema_version doesn't match SCHEMA_VERSION
    /// - File operations or serialization fail
    pub fn append(&self, report: &RunReport) -> Result<(), BenchError> {
        if report.schema_version != SCHEMA_VERSION {
            return Err(BenchError::Message(format!(
                "schema version mismatch: report has v{}, expected v{}",
                report.schema_version, SCHEMA_VERSION
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BenchError::Message(format!("failed to open file: {e}")))?;

        let json = serde_json::to_string(report)
            .map_err(|e| BenchError::Message(format!("failed to serialize report: {e}")))?;

        writeln!(file, "{}", json)
            .map_err(|e| BenchError::Message(format!("failed to write report: {e}")))?;

        tracing::debug!(path = %self.path.display(), record_id = %report.record_id, "appended report");
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<RunReport>, BenchError> {
        self.read_filtered(None)
    }

    /// Read reports, optionally only those for one backend kind.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist, a line fails to parse, or a
    /// line carries a schema version this build does not read.
    pub fn read_filtered(
        &self,
        backend_kind: Option<BackendKind>,
    ) -> Result<Vec<RunReport>, BenchError> {
        if !self.path.exists() {
            return Err(BenchError::Message(format!(
                "file not found: {}",
                self.path.display()
            )));
        }

        let file = File::open(&self.path)
            .map_err(|e| BenchError::Message(format!("failed to open file: {e}")))?;

        let reader = BufReader::new(file);
        let mut reports = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(|e| {
                BenchError::Message(format!("failed to read line {}: {e}", line_num + 1))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let report: RunReport = serde_json::from_str(&line).map_err(|e| {
                BenchError::Message(format!("failed to parse line {}: {e}", line_num + 1))
            })?;
            if report.schema_version != SCHEMA_VERSION {
                return Err(BenchError::Message(format!(
                    "line {}: unsupported schema version v{}",
                    line_num + 1,
                    report.schema_version
                )));
            }

            if backend_kind.is_some_and(|kind| report.backend_kind != kind) {
                continue;
            }

            reports.push(report);
        }

        Ok(reports)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Number of non-empty lines. Zero when the file is missing.
    pub fn count(&self) -> Result<usize, BenchError> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)
            .map_err(|e| BenchError::Message(format!("failed to open file: {e}")))?;

        let reader = BufReader::new(file);
        let count = reader
            .lines()
            .map_while(Result::ok)
            .filter(|l| !l.trim().is_empty())
            .count();

        Ok(count)
    }
}
