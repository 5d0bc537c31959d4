//! End-to-end runs through the orchestrator.

use anoncreds_bench::backend::selector::PARAM_PATH;
use anoncreds_bench::backend::{BackendKind, BackendSelector, ConnectionParams, MockStorageBackend};
use anoncreds_bench::core::Operation;
use anoncreds_bench::engine::{
    Harness, HarnessOptions, LifecycleManager, MockConfig, MockEngine, ReferenceEngine, SampleLog,
};
use anoncreds_bench::ledger::LocalLedgerConnector;
use anoncreds_bench::{BenchError, Phase, ProtocolOp};

fn quiet() -> HarnessOptions {
    HarnessOptions {
        demos: Vec::new(),
        detect_environment: false,
        ..HarnessOptions::default()
    }
}

fn enterprise_selector(dir: &tempfile::TempDir) -> BackendSelector {
    BackendSelector::new().with_params(
        BackendKind::Enterprise,
        ConnectionParams::from([(
            PARAM_PATH.to_string(),
            dir.path().to_string_lossy().to_string(),
        )]),
    )
}

#[test]
fn test_enterprise_five_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new(MockEngine::default_mock())
        .with_selector(enterprise_selector(&dir))
        .with_options(quiet());

    let report = harness.execute("enterprise", 5).unwrap();
    assert_eq!(report.backend_kind, BackendKind::Enterprise);
    assert_eq!(report.samples.len(), 10);
    assert!(report.verification_mismatches.is_empty());

    for op in [Operation::ProveCreate, Operation::ProveVerify] {
        let indices: Vec<u32> = report
            .samples
            .iter()
            .filter(|s| s.operation == op)
            .map(|s| s.iteration_index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(report.stats(op).unwrap().count, 5);
    }
}

#[test]
fn test_unknown_backend_falls_back_to_default() {
    let harness = Harness::new(MockEngine::default_mock()).with_options(quiet());
    let report = harness.execute("typo-backend", 3).unwrap();
    assert_eq!(report.backend_kind, BackendKind::Default);
    assert_eq!(report.config.backend_identifier, "typo-backend");
    assert_eq!(report.samples.len(), 6);
}

#[test]
fn test_mid_run_failure_commits_completed_iterations_only() {
    let storage = MockStorageBackend::new(BackendKind::Default);
    let probe = storage.probe();
    let harness = Harness::new(MockEngine::new(
        MockConfig::new("mock").fail_on(ProtocolOp::CreateProof, 3),
    ))
    .with_lifecycle(LifecycleManager::new(LocalLedgerConnector::default()).with_backend(storage))
    .with_options(quiet());

    let mut log = SampleLog::new();
    let err = harness.execute_with_log("default", 5, &mut log).unwrap_err();

    match &err {
        BenchError::RunFailed { phase, cause } => {
            assert_eq!(*phase, Phase::Loop);
            assert!(matches!(
                **cause,
                BenchError::ProtocolOperationFailed {
                    operation: ProtocolOp::CreateProof,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(log.samples().len(), 4);
    assert!(log.samples().iter().all(|s| s.iteration_index <= 1));
    assert_eq!(probe.open_handles(), 0);
}

#[test]
fn test_mismatches_surface_in_report() {
    let harness = Harness::new(MockEngine::new(
        MockConfig::new("mock").verify_false_on(2).verify_false_on(4),
    ))
    .with_options(quiet());

    let report = harness.execute("default", 4).unwrap();
    assert_eq!(report.samples.len(), 8);
    let flagged: Vec<u32> = report
        .verification_mismatches
        .iter()
        .map(|m| m.iteration_index)
        .collect();
    assert_eq!(flagged, vec![1, 3]);
    assert!(!report.is_clean());
}

#[test]
fn test_reference_engine_on_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new(ReferenceEngine::new())
        .with_selector(enterprise_selector(&dir))
        .with_options(HarnessOptions {
            detect_environment: false,
            time_issuance: true,
            warmup: 1,
            ..HarnessOptions::default()
        });

    for backend in ["default", "enterprise"] {
        let report = harness.execute(backend, 3).unwrap();
        assert!(report.is_clean(), "{backend}: {:?}", report.verification_mismatches);
        assert_eq!(report.samples.len(), 9);
        assert_eq!(report.stats(Operation::Issue).unwrap().count, 3);
        assert_eq!(report.config.engine.as_deref(), Some("reference"));
    }
}

#[test]
fn test_run_failed_error_chain_mentions_phase_and_operation() {
    let harness = Harness::new(MockEngine::new(
        MockConfig::new("mock").fail_on(ProtocolOp::VerifyProof, 1),
    ))
    .with_options(quiet());
    let err = harness.execute("default", 2).unwrap_err();

    assert_eq!(err.to_string(), "run failed in loop phase");
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "protocol operation verify_proof failed");
    assert!(matches!(err.root_cause(), BenchError::Message(_)));
}
