pub mod backend;
pub mod bench;
pub mod core;
pub mod engine;
pub mod ledger;
pub mod report;
pub mod storage;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Setup or measurement phase a run was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Resolve,
    Acquire,
    Demo,
    Loop,
    Summarize,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Resolve => "resolve",
            Phase::Acquire => "acquire",
            Phase::Demo => "demo",
            Phase::Loop => "loop",
            Phase::Summarize => "summarize",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation exposed by the protocol facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolOp {
    IssueCredential,
    CreateProofRequest,
    CreateProof,
    VerifyProof,
}

impl ProtocolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolOp::IssueCredential => "issue_credential",
            ProtocolOp::CreateProofRequest => "create_proof_request",
            ProtocolOp::CreateProof => "create_proof",
            ProtocolOp::VerifyProof => "verify_proof",
        }
    }
}

impl fmt::Display for ProtocolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("{0}")]
    Message(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("failed to create {role} identity: {reason}")]
    IdentityCreationFailed {
        role: engine::identity::Role,
        reason: String,
    },
    #[error("protocol operation {operation} failed")]
    ProtocolOperationFailed {
        operation: ProtocolOp,
        #[source]
        cause: Box<BenchError>,
    },
    #[error("run failed in {phase} phase")]
    RunFailed {
        phase: Phase,
        #[source]
        cause: Box<BenchError>,
    },
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    pub fn run_failed(phase: Phase, cause: BenchError) -> Self {
        BenchError::RunFailed {
            phase,
            cause: Box::new(cause),
        }
    }

    /// Phase attached to a `RunFailed` error, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            BenchError::RunFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Innermost error, skipping `RunFailed` and `ProtocolOperationFailed` wrappers.
    pub fn root_cause(&self) -> &BenchError {
        match self {
            BenchError::RunFailed { cause, .. } => cause.root_cause(),
            BenchError::ProtocolOperationFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
