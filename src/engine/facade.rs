//! Credentials engine trait and the protocol facade the benchmark loop calls.

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult, ProtocolOp};

use super::lifecycle::RunContext;

/// Reference to an issued credential held in the prover's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    pub id: String,
    /// Engine-defined description (e.g. the credential definition id).
    pub body: String,
}

/// Reference to a verifier's proof request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequestRef {
    pub id: String,
    pub body: String,
}

/// Reference to a constructed proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRef {
    pub id: String,
    pub body: String,
}

/// External anonymous-credentials engine.
///
/// Every call is synchronous: it returns only once the operation, including
/// any storage or ledger round-trips, has completed or failed.
pub trait CredentialEngine: Send + Sync {
    /// Engine name (e.g., "reference", "mock").
    fn name(&self) -> &str;

    /// Issue a new credential from the issuer to the prover.
    fn issue_credential(&self, ctx: &mut RunContext) -> BenchResult<CredentialRef>;

    /// Create a new proof request on behalf of the verifier.
    fn create_proof_request(&self, ctx: &mut RunContext) -> BenchResult<ProofRequestRef>;

    /// Build a proof for `request` from `credential`.
    fn create_proof(
        &self,
        ctx: &mut RunContext,
        credential: &CredentialRef,
        request: &ProofRequestRef,
    ) -> BenchResult<ProofRef>;

    /// Verify a proof.
    ///
    /// Returns `Ok(false)` for a well-formed proof that does not verify; errors
    /// are reserved for failures to carry out verification at all.
    fn verify_proof(&self, ctx: &mut RunContext, proof: &ProofRef) -> BenchResult<bool>;
}

/// Uniform surface over a `CredentialEngine`.
///
/// Rejects calls on a released context and wraps every engine error in
/// `BenchError::ProtocolOperationFailed`.
#[derive(Clone, Copy)]
pub struct ProtocolFacade<'e> {
    engine: &'e dyn CredentialEngine,
}

impl<'e> ProtocolFacade<'e> {
    pub fn new(engine: &'e dyn CredentialEngine) -> Self {
        ProtocolFacade { engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn issue_credential(&self, ctx: &mut RunContext) -> BenchResult<CredentialRef> {
        guard(ProtocolOp::IssueCredential, ctx)?;
        self.engine
            .issue_credential(ctx)
            .map_err(|e| wrap(ProtocolOp::IssueCredential, e))
    }

    pub fn create_proof_request(&self, ctx: &mut RunContext) -> BenchResult<ProofRequestRef> {
        guard(ProtocolOp::CreateProofRequest, ctx)?;
        self.engine
            .create_proof_request(ctx)
            .map_err(|e| wrap(ProtocolOp::CreateProofRequest, e))
    }

    pub fn create_proof(
        &self,
        ctx: &mut RunContext,
        credential: &CredentialRef,
        request: &ProofRequestRef,
    ) -> BenchResult<ProofRef> {
        guard(ProtocolOp::CreateProof, ctx)?;
        self.engine
            .create_proof(ctx, credential, request)
            .map_err(|e| wrap(ProtocolOp::CreateProof, e))
    }

    pub fn verify_proof(&self, ctx: &mut RunContext, proof: &ProofRef) -> BenchResult<bool> {
        guard(ProtocolOp::VerifyProof, ctx)?;
        self.engine
            .verify_proof(ctx, proof)
            .map_err(|e| wrap(ProtocolOp::VerifyProof, e))
    }
}

fn guard(operation: ProtocolOp, ctx: &RunContext) -> BenchResult<()> {
    if ctx.is_released() {
        return Err(wrap(
            operation,
            BenchError::Message("run context already released".into()),
        ));
    }
    Ok(())
}

fn wrap(operation: ProtocolOp, cause: BenchError) -> BenchError {
    BenchError::ProtocolOperationFailed {
        operation,
        cause: Box::new(cause),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::resolve;
    use crate::engine::lifecycle::LifecycleManager;
    use crate::engine::mock::{MockConfig, MockEngine};

    #[test]
    fn test_facade_wraps_engine_errors() {
        let engine = MockEngine::new(MockConfig::new("mock").fail_on(ProtocolOp::CreateProofRequest, 1));
        let facade = ProtocolFacade::new(&engine);
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();

        let err = facade.create_proof_request(&mut ctx).unwrap_err();
        match err {
            BenchError::ProtocolOperationFailed { operation, cause } => {
                assert_eq!(operation, ProtocolOp::CreateProofRequest);
                assert!(cause.to_string().contains("mock"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_facade_rejects_released_context() {
        let engine = MockEngine::default_mock();
        let facade = ProtocolFacade::new(&engine);
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();
        ctx.release();

        let err = facade.issue_credential(&mut ctx).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ProtocolOperationFailed {
                operation: ProtocolOp::IssueCredential,
                ..
            }
        ));
        // The engine was never reached
        assert_eq!(engine.calls(ProtocolOp::IssueCredential), 0);
    }

    #[test]
    fn test_facade_passes_verification_result_through() {
        let engine = MockEngine::new(MockConfig::new("mock").verify_false_on(1));
        let facade = ProtocolFacade::new(&engine);
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();

        let cred = facade.issue_credential(&mut ctx).unwrap();
        let req = facade.create_proof_request(&mut ctx).unwrap();
        let proof = facade.create_proof(&mut ctx, &cred, &req).unwrap();
        assert!(!facade.verify_proof(&mut ctx, &proof).unwrap());
        assert!(facade.verify_proof(&mut ctx, &proof).unwrap());
        assert_eq!(facade.engine_name(), "mock");
    }
}
