//! RunReport schema v1 - canonical schema for all benchmark outputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;

use super::env::EnvironmentInfo;

/// Schema version for forward compatibility
pub const SCHEMA_VERSION: u32 = 1;

/// Timed protocol operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Issue,
    ProveCreate,
    ProveVerify,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Issue, Operation::ProveCreate, Operation::ProveVerify];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Issue => "issue",
            Operation::ProveCreate => "prove_create",
            Operation::ProveVerify => "prove_verify",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed call from a single loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub operation: Operation,
    pub duration_nanos: u64,
    pub iteration_index: u32,
}

/// Summary statistics for one operation. All durations in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub count: u64,
    pub total_nanos: u128,
    pub mean_nanos: u64,
    pub p50_nanos: u64,
    pub p95_nanos: u64,
    pub p99_nanos: u64,
    pub min_nanos: u64,
    pub max_nanos: u64,
}

/// Iteration whose proof verified as false without an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMismatch {
    pub iteration_index: u32,
}

/// Run configuration for benchmarks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub backend_identifier: String,
    pub warmup_iterations: u32,
    pub measured_iterations: u32,
    pub time_issuance: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            backend_identifier: "default".to_string(),
            warmup_iterations: 0,
            measured_iterations: 10,
            time_issuance: false,
            engine: None,
        }
    }
}

/// Canonical benchmark record - the unified output schema for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    /// Unique identifier for this record
    pub record_id: String,

    /// ISO 8601 timestamp
    pub timestamp: String,

    /// Storage backend the run measured
    pub backend_kind: BackendKind,

    /// Run configuration
    pub config: RunConfig,

    /// Environment information (CPU, OS, git, etc.)
    #[serde(default)]
    pub env: EnvironmentInfo,

    /// Samples in iteration order
    pub samples: Vec<Sample>,

    /// Per-operation statistics
    pub summary: BTreeMap<Operation, Stats>,

    /// Iterations whose proofs did not verify
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_mismatches: Vec<VerificationMismatch>,
}

impl RunReport {
    /// Create an empty report with generated id and timestamp.
    pub fn new(backend_kind: BackendKind, config: RunConfig, env: EnvironmentInfo) -> Self {
        let timestamp = crate::now_rfc3339();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let compact: String = timestamp
            .chars()
            .take(19)
            .filter(|c| !matches!(c, ':' | '-' | 'T'))
            .collect();
        let record_id = format!("{:x}-{}", nanos, compact);

        RunReport {
            schema_version: SCHEMA_VERSION,
            record_id,
            timestamp,
            backend_kind,
            config,
            env,
            samples: Vec::new(),
            summary: BTreeMap::new(),
            verification_mismatches: Vec::new(),
        }
    }

    pub fn stats(&self, operation: Operation) -> Option<&Stats> {
        self.summary.get(&operation)
    }

    /// True when every measured proof verified.
    pub fn is_clean(&self) -> bool {
        self.verification_mismatches.is_empty()
    }
}
