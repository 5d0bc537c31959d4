//! The timed prove/verify loop.
//!
//! Each iteration builds a fresh `ProofTask` (new credential, new proof
//! request) outside the timed region, then times `create_proof` and
//! `verify_proof` as single units. Samples of an iteration are staged and
//! committed to the `SampleLog` only once the iteration completes, so an
//! aborted run never leaves a half-recorded iteration behind.

use std::time::{Duration, Instant};

use crate::core::{Operation, Sample, VerificationMismatch};
use crate::{BenchError, BenchResult};

use super::facade::{CredentialRef, ProofRequestRef, ProtocolFacade};
use super::lifecycle::RunContext;

/// Loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// Measured iterations, must be positive
    pub iterations: u32,
    /// Untimed iterations run before measurement
    pub warmup: u32,
    /// Also record a sample for `issue_credential`
    pub time_issuance: bool,
}

impl LoopOptions {
    pub fn new(iterations: u32) -> Self {
        LoopOptions {
            iterations,
            warmup: 0,
            time_issuance: false,
        }
    }

    pub fn with_warmup(mut self, warmup: u32) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_time_issuance(mut self, time_issuance: bool) -> Self {
        self.time_issuance = time_issuance;
        self
    }
}

/// Inputs of one iteration. Never reused across iterations.
#[derive(Debug)]
pub struct ProofTask {
    pub credential: CredentialRef,
    pub proof_request: ProofRequestRef,
}

/// Commit log of completed iterations.
#[derive(Debug, Default)]
pub struct SampleLog {
    samples: Vec<Sample>,
    mismatches: Vec<VerificationMismatch>,
    completed: u32,
}

impl SampleLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn commit(&mut self, staged: Vec<Sample>, mismatch: Option<VerificationMismatch>) {
        self.samples.extend(staged);
        self.mismatches.extend(mismatch);
        self.completed += 1;
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn mismatches(&self) -> &[VerificationMismatch] {
        &self.mismatches
    }

    pub fn completed_iterations(&self) -> u32 {
        self.completed
    }

    /// True until the first iteration is committed.
    pub fn is_empty(&self) -> bool {
        self.completed == 0 && self.samples.is_empty() && self.mismatches.is_empty()
    }

    pub fn into_outcome(self) -> LoopOutcome {
        LoopOutcome {
            samples: self.samples,
            mismatches: self.mismatches,
        }
    }
}

/// Result of a loop that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopOutcome {
    pub samples: Vec<Sample>,
    pub mismatches: Vec<VerificationMismatch>,
}

fn nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

/// Sequential benchmark loop over a protocol facade.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkLoop {
    options: LoopOptions,
}

impl BenchmarkLoop {
    pub fn new(options: LoopOptions) -> Self {
        BenchmarkLoop { options }
    }

    /// Run warm-up and measured iterations and return the committed samples.
    ///
    /// The context is only borrowed; nothing is released here on failure.
    pub fn run(&self, ctx: &mut RunContext, facade: &ProtocolFacade<'_>) -> BenchResult<LoopOutcome> {
        let mut log = SampleLog::new();
        self.run_with_log(ctx, facade, &mut log)?;
        Ok(log.into_outcome())
    }

    /// Like `run`, committing into a caller-owned log that survives an abort.
    pub fn run_with_log(
        &self,
        ctx: &mut RunContext,
        facade: &ProtocolFacade<'_>,
        log: &mut SampleLog,
    ) -> BenchResult<()> {
        if self.options.iterations == 0 {
            return Err(BenchError::Message("iterations must be at least 1".into()));
        }

        for i in 0..self.options.warmup {
            let task = Self::task(ctx, facade)?;
            let proof = facade.create_proof(ctx, &task.credential, &task.proof_request)?;
            let verified = facade.verify_proof(ctx, &proof)?;
            if !verified {
                tracing::warn!(warmup = i, "warm-up proof did not verify");
            }
            tracing::trace!(warmup = i, verified, "warm-up iteration");
        }
        if self.options.warmup > 0 {
            tracing::debug!(warmup = self.options.warmup, "warm-up complete");
        }

        for index in 0..self.options.iterations {
            self.iteration(index, ctx, facade, log)?;
        }
        Ok(())
    }

    fn task(ctx: &mut RunContext, facade: &ProtocolFacade<'_>) -> BenchResult<ProofTask> {
        let credential = facade.issue_credential(ctx)?;
        let proof_request = facade.create_proof_request(ctx)?;
        Ok(ProofTask {
            credential,
            proof_request,
        })
    }

    fn iteration(
        &self,
        index: u32,
        ctx: &mut RunContext,
        facade: &ProtocolFacade<'_>,
        log: &mut SampleLog,
    ) -> BenchResult<()> {
        let mut staged = Vec::with_capacity(3);
        let sample = |operation, elapsed| Sample {
            operation,
            duration_nanos: nanos(elapsed),
            iteration_index: index,
        };

        let task = if self.options.time_issuance {
            let started = Instant::now();
            let credential = facade.issue_credential(ctx)?;
            staged.push(sample(Operation::Issue, started.elapsed()));
            ProofTask {
                credential,
                proof_request: facade.create_proof_request(ctx)?,
            }
        } else {
            Self::task(ctx, facade)?
        };

        let started = Instant::now();
        let proof = facade.create_proof(ctx, &task.credential, &task.proof_request)?;
        let create = started.elapsed();
        staged.push(sample(Operation::ProveCreate, create));

        let started = Instant::now();
        let verified = facade.verify_proof(ctx, &proof)?;
        let verify = started.elapsed();
        staged.push(sample(Operation::ProveVerify, verify));

        let mismatch = if verified {
            None
        } else {
            tracing::warn!(iteration = index, "proof did not verify");
            Some(VerificationMismatch {
                iteration_index: index,
            })
        };
        tracing::debug!(
            iteration = index,
            create_nanos = nanos(create),
            verify_nanos = nanos(verify),
            verified,
            "iteration complete"
        );
        log.commit(staged, mismatch);
        Ok(())
    }
}
