//! Engine module: everything between a resolved backend and a finished report.
//!
//! # Architecture
//!
//! - **Lifecycle** (`lifecycle`): acquires the wallet, ledger connection and
//!   identities into a `RunContext` and releases them on every exit path.
//! - **Facade** (`facade`): the four protocol operations over a pluggable
//!   `CredentialEngine`, with uniform error wrapping.
//! - **Loop** (`bench_loop`): the timed prove/verify iterations.
//! - **Orchestrator** (`orchestrator`): sequences the phases of a run and
//!   tags failures with the phase they happened in.
//!
//! `ReferenceEngine` is the built-in engine; `MockEngine` is for tests.

pub mod bench_loop;
pub mod demo;
pub mod facade;
pub mod identity;
pub mod lifecycle;
pub mod mock;
pub mod orchestrator;
pub mod reference;

// Re-export key types for convenience
pub use bench_loop::{BenchmarkLoop, LoopOptions, LoopOutcome, ProofTask, SampleLog};
pub use demo::{Demo, run_demos};
pub use facade::{CredentialEngine, CredentialRef, ProofRef, ProofRequestRef, ProtocolFacade};
pub use identity::{Identity, IdentityProvider, Role, WalletIdentityProvider};
pub use lifecycle::{LifecycleManager, RunContext};
pub use mock::{MockConfig, MockEngine};
pub use orchestrator::{Harness, HarnessOptions};
pub use reference::ReferenceEngine;
