//! Command implementations behind the `anoncreds-bench` binary.

use std::path::PathBuf;

use crate::BenchResult;
use crate::backend::BackendKind;
use crate::core::RunReport;
use crate::engine::{CredentialEngine, Harness, ReferenceEngine};
use crate::report::render_text;
use crate::storage::{CsvExporter, JsonlWriter};

use super::config::HarnessConfig;

/// Command-line overrides for a run. `None` and `false` keep the config value.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub wallet_type: Option<String>,
    pub iterations: Option<u32>,
    pub warmup: Option<u32>,
    pub time_issuance: bool,
    pub no_demo: bool,
    pub config: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Config file (if any) with command-line overrides applied, validated.
pub fn resolve_config(args: &RunArgs) -> BenchResult<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(wallet_type) = &args.wallet_type {
        config.backend = wallet_type.clone();
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(warmup) = args.warmup {
        config.warmup = warmup;
    }
    if args.time_issuance {
        config.time_issuance = true;
    }
    if args.no_demo {
        config.demos = false;
    }
    config.validate()?;
    Ok(config)
}

/// Run the benchmark with the reference engine.
pub fn run(args: RunArgs) -> BenchResult<RunReport> {
    run_with_engine(args, ReferenceEngine::new())
}

/// Run the benchmark, print the report, and write any requested outputs.
pub fn run_with_engine(args: RunArgs, engine: impl CredentialEngine + 'static) -> BenchResult<RunReport> {
    let config = resolve_config(&args)?;
    let harness = Harness::new(engine)
        .with_selector(config.selector()?)
        .with_options(config.harness_options());

    let report = harness.execute(&config.backend, config.iterations)?;
    print!("{}", render_text(&report));

    if let Some(path) = &args.json {
        JsonlWriter::new(path).append(&report)?;
        tracing::info!(path = %path.display(), "appended report");
    }
    if let Some(path) = &args.csv {
        CsvExporter::new().export(std::slice::from_ref(&report), path)?;
        tracing::info!(path = %path.display(), "wrote CSV");
    }
    Ok(report)
}

/// Convert stored JSONL reports to CSV, to `output` or stdout.
pub fn export_csv(
    jsonl: PathBuf,
    output: Option<PathBuf>,
    backend: Option<String>,
) -> BenchResult<()> {
    let kind = match backend.as_deref() {
        Some(id) => Some(BackendKind::from_identifier(id).ok_or_else(|| {
            crate::BenchError::Message(format!("unknown backend kind '{id}'"))
        })?),
        None => None,
    };
    let reports = JsonlWriter::new(&jsonl).read_filtered(kind)?;
    let exporter = CsvExporter::new();
    match output {
        Some(path) => {
            exporter.export(&reports, &path)?;
            tracing::info!(reports = reports.len(), path = %path.display(), "exported CSV");
        }
        None => exporter.export_to_stdout(&reports)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(&path, "[harness]\nbackend = \"enterprise\"\niterations = 50\n").unwrap();

        let config = resolve_config(&RunArgs {
            config: Some(path),
            iterations: Some(4),
            no_demo: true,
            ..RunArgs::default()
        })
        .unwrap();
        assert_eq!(config.backend, "enterprise");
        assert_eq!(config.iterations, 4);
        assert!(!config.demos);
    }

    #[test]
    fn test_zero_iterations_rejected_at_boundary() {
        let args = RunArgs {
            iterations: Some(0),
            ..RunArgs::default()
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_run_writes_outputs_then_exports() {
        let dir = tempfile::tempdir().unwrap();
        let jsonl = dir.path().join("out").join("runs.jsonl");
        let csv = dir.path().join("out").join("run.csv");

        let report = run_with_engine(
            RunArgs {
                iterations: Some(2),
                json: Some(jsonl.clone()),
                csv: Some(csv.clone()),
                ..RunArgs::default()
            },
            MockEngine::default_mock(),
        )
        .unwrap();
        assert_eq!(report.samples.len(), 4);
        assert_eq!(JsonlWriter::new(&jsonl).count().unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&csv).unwrap().lines().count(), 3);

        let exported = dir.path().join("all.csv");
        export_csv(jsonl.clone(), Some(exported.clone()), Some("default".into())).unwrap();
        assert_eq!(std::fs::read_to_string(&exported).unwrap().lines().count(), 3);

        assert!(export_csv(jsonl, None, Some("postgres".into())).is_err());
    }
}
