//! Integration tests for JSONL storage and CSV export of run reports.

use anoncreds_bench::backend::selector::PARAM_PATH;
use anoncreds_bench::backend::{BackendKind, BackendSelector, ConnectionParams};
use anoncreds_bench::core::env::EnvironmentInfo;
use anoncreds_bench::core::schema::{Operation, RunConfig, RunReport};
use anoncreds_bench::engine::{Harness, HarnessOptions, MockEngine};
use anoncreds_bench::storage::{CsvExporter, JsonlWriter};

/// Helper to run a small real benchmark and return its report
fn make_report(backend: &str) -> RunReport {
    let wallets = tempfile::tempdir().unwrap();
    Harness::new(MockEngine::default_mock())
        .with_selector(BackendSelector::new().with_params(
            BackendKind::Enterprise,
            ConnectionParams::from([(
                PARAM_PATH.to_string(),
                wallets.path().to_string_lossy().to_string(),
            )]),
        ))
        .with_options(HarnessOptions {
            demos: Vec::new(),
            detect_environment: false,
            ..HarnessOptions::default()
        })
        .execute(backend, 3)
        .expect("run failed")
}

#[test]
fn test_write_and_read_multiple_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.jsonl");
    let writer = JsonlWriter::new(&path);

    let first = make_report("default");
    let second = make_report("default");
    writer.append(&first).expect("failed to append report 1");
    writer.append(&second).expect("failed to append report 2");

    let reports = writer.read_all().expect("failed to read reports");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].record_id, first.record_id);
    assert_eq!(reports[1].record_id, second.record_id);

    // Samples and summary survive the round trip
    assert_eq!(reports[0].samples, first.samples);
    assert_eq!(reports[0].summary, first.summary);
    assert_eq!(reports[0].config, first.config);
}

#[test]
fn test_append_does_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("append_test.jsonl"));

    for _ in 0..3 {
        writer
            .append(&RunReport::new(
                BackendKind::Default,
                RunConfig::default(),
                EnvironmentInfo::default(),
            ))
            .unwrap();
    }
    assert_eq!(writer.count().unwrap(), 3);
}

#[test]
fn test_blank_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.jsonl");
    let report = make_report("default");
    let line = serde_json::to_string(&report).unwrap();
    std::fs::write(&path, format!("\n{line}\n\n{line}\n")).unwrap();

    let writer = JsonlWriter::new(&path);
    assert_eq!(writer.count().unwrap(), 2);
    assert_eq!(writer.read_all().unwrap().len(), 2);
}

#[test]
fn test_corrupt_line_reports_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.jsonl");
    let line = serde_json::to_string(&make_report("default")).unwrap();
    std::fs::write(&path, format!("{line}\n{{not json\n")).unwrap();

    let err = JsonlWriter::new(&path).read_all().unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_stored_reports_export_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("runs.jsonl"));
    writer.append(&make_report("default")).unwrap();
    writer.append(&make_report("enterprise")).unwrap();

    let enterprise = writer.read_filtered(Some(BackendKind::Enterprise)).unwrap();
    assert_eq!(enterprise.len(), 1);

    let mut buffer = Vec::new();
    CsvExporter::new()
        .export_to_writer(&writer.read_all().unwrap(), &mut buffer)
        .unwrap();
    let csv = String::from_utf8(buffer).unwrap();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows.iter()
            .filter(|r| r.contains(Operation::ProveVerify.as_str()))
            .count(),
        2
    );
}
