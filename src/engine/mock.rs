//! Mock credentials engine for testing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::{BenchError, BenchResult, ProtocolOp};

use super::facade::{CredentialEngine, CredentialRef, ProofRef, ProofRequestRef};
use super::lifecycle::RunContext;

/// Configuration for mock engine responses.
///
/// Call numbers are 1-based and counted per operation over the engine's lifetime.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Name to report
    pub name: String,
    /// Operations that fail, with the call number that fails
    pub failures: Vec<(ProtocolOp, u64)>,
    /// `verify_proof` call numbers that return false
    pub verify_false_calls: Vec<u64>,
    /// Whether every `verify_proof` call returns false
    pub verify_always_false: bool,
    /// Artificial latency added to every call
    pub latency: Option<Duration>,
}

impl MockConfig {
    /// Create a new mock config with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        MockConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fail the `call`-th invocation of `operation`.
    pub fn fail_on(mut self, operation: ProtocolOp, call: u64) -> Self {
        self.failures.push((operation, call));
        self
    }

    /// Return false from the `call`-th `verify_proof`.
    pub fn verify_false_on(mut self, call: u64) -> Self {
        self.verify_false_calls.push(call);
        self
    }

    /// Make every proof fail verification.
    pub fn verify_always_false(mut self) -> Self {
        self.verify_always_false = true;
        self
    }

    /// Sleep for `latency` inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Mock engine for unit testing.
///
/// Returns synthetic references without doing any cryptography. Every call
/// touches the context's wallet so a call on a dead handle surfaces as an error.
pub struct MockEngine {
    config: MockConfig,
    calls: Mutex<HashMap<ProtocolOp, u64>>,
}

impl MockEngine {
    pub fn new(config: MockConfig) -> Self {
        MockEngine {
            config,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Create a mock engine that always succeeds and verifies.
    pub fn default_mock() -> Self {
        Self::new(MockConfig::new("mock"))
    }

    /// Number of calls made to `operation` so far.
    pub fn calls(&self, operation: ProtocolOp) -> u64 {
        self.calls
            .lock()
            .map(|c| c.get(&operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn enter(&self, operation: ProtocolOp, ctx: &mut RunContext) -> BenchResult<u64> {
        let call = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| BenchError::Message("mock call counter poisoned".into()))?;
            let n = calls.entry(operation).or_insert(0);
            *n += 1;
            *n
        };
        ctx.storage()?;
        if let Some(latency) = self.config.latency {
            std::thread::sleep(latency);
        }
        if self.config.failures.contains(&(operation, call)) {
            return Err(BenchError::Message(format!("mock {operation} failed on call {call}")));
        }
        Ok(call)
    }
}

impl CredentialEngine for MockEngine {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn issue_credential(&self, ctx: &mut RunContext) -> BenchResult<CredentialRef> {
        let call = self.enter(ProtocolOp::IssueCredential, ctx)?;
        Ok(CredentialRef {
            id: format!("mock-cred-{call}"),
            body: String::new(),
        })
    }

    fn create_proof_request(&self, ctx: &mut RunContext) -> BenchResult<ProofRequestRef> {
        let call = self.enter(ProtocolOp::CreateProofRequest, ctx)?;
        Ok(ProofRequestRef {
            id: format!("mock-req-{call}"),
            body: String::new(),
        })
    }

    fn create_proof(
        &self,
        ctx: &mut RunContext,
        credential: &CredentialRef,
        request: &ProofRequestRef,
    ) -> BenchResult<ProofRef> {
        let call = self.enter(ProtocolOp::CreateProof, ctx)?;
        Ok(ProofRef {
            id: format!("mock-proof-{call}"),
            body: format!("{}|{}", credential.id, request.id),
        })
    }

    fn verify_proof(&self, ctx: &mut RunContext, _proof: &ProofRef) -> BenchResult<bool> {
        let call = self.enter(ProtocolOp::VerifyProof, ctx)?;
        Ok(!(self.config.verify_always_false || self.config.verify_false_calls.contains(&call)))
    }
}
