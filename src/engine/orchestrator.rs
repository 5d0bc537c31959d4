//! Run orchestration: resolve, acquire, demos, loop, summarize, release.

use crate::backend::BackendSelector;
use crate::core::{EnvironmentInfo, RunConfig, RunReport};
use crate::report::aggregate;
use crate::{BenchError, BenchResult, Phase};

use super::bench_loop::{BenchmarkLoop, LoopOptions, SampleLog};
use super::demo::{Demo, run_demos};
use super::facade::{CredentialEngine, ProtocolFacade};
use super::lifecycle::LifecycleManager;

/// Knobs of a run beyond backend and iteration count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOptions {
    pub warmup: u32,
    pub time_issuance: bool,
    /// Demos to run after acquisition, in order
    pub demos: Vec<Demo>,
    /// Probe CPU, memory and git state for the report
    pub detect_environment: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        HarnessOptions {
            warmup: 0,
            time_issuance: false,
            demos: Demo::ALL.to_vec(),
            detect_environment: true,
        }
    }
}

/// Drives one benchmark run end to end.
pub struct Harness {
    selector: BackendSelector,
    lifecycle: LifecycleManager,
    engine: Box<dyn CredentialEngine>,
    options: HarnessOptions,
}

impl Harness {
    /// Harness with built-in backends, a local ledger and default options.
    pub fn new(engine: impl CredentialEngine + 'static) -> Self {
        Harness {
            selector: BackendSelector::new(),
            lifecycle: LifecycleManager::builtin(),
            engine: Box::new(engine),
            options: HarnessOptions::default(),
        }
    }

    pub fn with_selector(mut self, selector: BackendSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecycleManager) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_options(mut self, options: HarnessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Run `iterations` measured iterations against `backend_identifier`.
    ///
    /// # Errors
    /// `BenchError::RunFailed` naming the phase that failed. Resources are
    /// released before the error is returned.
    ///
    /// Release runs on every return path and on unwind. A process killed by a
    /// signal such as SIGINT never reaches it: enterprise metadata written
    /// since open is not flushed and pending ledger writes are not drained.
    pub fn execute(&self, backend_identifier: &str, iterations: u32) -> BenchResult<RunReport> {
        let mut log = SampleLog::new();
        self.execute_with_log(backend_identifier, iterations, &mut log)
    }

    /// Like `execute`, committing loop samples into `log` as iterations
    /// complete. On a loop failure `log` holds every completed iteration.
    ///
    /// `log` must be empty on entry; a log left over from an earlier run fails
    /// in the resolve phase without touching any backend.
    pub fn execute_with_log(
        &self,
        backend_identifier: &str,
        iterations: u32,
        log: &mut SampleLog,
    ) -> BenchResult<RunReport> {
        let _span = tracing::info_span!(
            "run",
            backend = backend_identifier,
            iterations,
            engine = self.engine.name()
        )
        .entered();

        if iterations == 0 {
            return Err(BenchError::run_failed(
                Phase::Resolve,
                BenchError::Message("iterations must be at least 1".into()),
            ));
        }
        if !log.is_empty() {
            return Err(BenchError::run_failed(
                Phase::Resolve,
                BenchError::Message(format!(
                    "sample log already holds {} completed iterations",
                    log.completed_iterations()
                )),
            ));
        }
        let backend = self.selector.resolve(backend_identifier);
        tracing::info!(kind = %backend.kind, "backend resolved");

        let mut ctx = self
            .lifecycle
            .acquire(&backend)
            .map_err(|e| BenchError::run_failed(Phase::Acquire, e))?;
        let facade = ProtocolFacade::new(self.engine.as_ref());

        if !self.options.demos.is_empty() {
            run_demos(&mut ctx, &facade, &self.options.demos)
                .map_err(|e| BenchError::run_failed(Phase::Demo, e))?;
        }

        let bench_loop = BenchmarkLoop::new(
            LoopOptions::new(iterations)
                .with_warmup(self.options.warmup)
                .with_time_issuance(self.options.time_issuance),
        );
        {
            let _span = tracing::info_span!("loop").entered();
            bench_loop
                .run_with_log(&mut ctx, &facade, log)
                .map_err(|e| BenchError::run_failed(Phase::Loop, e))?;
        }

        let config = RunConfig {
            backend_identifier: backend_identifier.to_string(),
            warmup_iterations: self.options.warmup,
            measured_iterations: iterations,
            time_issuance: self.options.time_issuance,
            engine: Some(self.engine.name().to_string()),
        };
        let env = if self.options.detect_environment {
            EnvironmentInfo::detect()
        } else {
            EnvironmentInfo::default()
        };
        let report = aggregate::summarize(
            ctx.backend_kind(),
            config,
            env,
            log.samples().to_vec(),
            log.mismatches().to_vec(),
        )
        .map_err(|e| BenchError::run_failed(Phase::Summarize, e))?;

        self.lifecycle.release(&mut ctx);
        tracing::info!(
            samples = report.samples.len(),
            mismatches = report.verification_mismatches.len(),
            "run complete"
        );
        Ok(report)
    }
}
