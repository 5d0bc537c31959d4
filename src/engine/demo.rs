//! Pre-benchmark demos.
//!
//! Each demo exercises one collaborator end to end against the acquired
//! context before anything is measured, so a broken engine, identity or ledger
//! shows up as a `demo` phase failure rather than as skewed timings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ledger::{EntryKind, LedgerEntry};
use crate::{BenchError, BenchResult};

use super::facade::ProtocolFacade;
use super::lifecycle::RunContext;

const CRYPTO_DEMO_MESSAGE: &[u8] = b"anoncreds-bench crypto demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Demo {
    Anoncreds,
    Crypto,
    Ledger,
}

impl Demo {
    pub const ALL: [Demo; 3] = [Demo::Anoncreds, Demo::Crypto, Demo::Ledger];

    pub fn as_str(&self) -> &'static str {
        match self {
            Demo::Anoncreds => "anoncreds",
            Demo::Crypto => "crypto",
            Demo::Ledger => "ledger",
        }
    }
}

impl fmt::Display for Demo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Demo {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Demo::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BenchError::Message(format!("unknown demo '{s}'")))
    }
}

/// One issue, request, prove and verify cycle. The proof must verify.
pub fn anoncreds_demo(ctx: &mut RunContext, facade: &ProtocolFacade<'_>) -> BenchResult<()> {
    let credential = facade.issue_credential(ctx)?;
    let request = facade.create_proof_request(ctx)?;
    let proof = facade.create_proof(ctx, &credential, &request)?;
    if !facade.verify_proof(ctx, &proof)? {
        return Err(BenchError::Message(
            "anoncreds demo: proof did not verify".into(),
        ));
    }
    Ok(())
}

/// Issuer signs a message; the issuer's signature checks and the prover's does not.
pub fn crypto_demo(ctx: &RunContext) -> BenchResult<()> {
    let issuer = ctx.issuer()?;
    let prover = ctx.prover()?;
    let signature = issuer.sign(CRYPTO_DEMO_MESSAGE);
    if !issuer.verify(CRYPTO_DEMO_MESSAGE, &signature) {
        return Err(BenchError::Message(
            "crypto demo: issuer signature did not verify".into(),
        ));
    }
    if prover.verify(CRYPTO_DEMO_MESSAGE, &signature) {
        return Err(BenchError::Message(
            "crypto demo: signature verified under the wrong key".into(),
        ));
    }
    Ok(())
}

/// Anchor the prover's NYM and read it back after a drain.
pub fn ledger_demo(ctx: &mut RunContext) -> BenchResult<()> {
    let prover = ctx.prover()?.clone();
    let ledger = ctx.ledger()?;
    ledger.anchor(LedgerEntry::new(
        EntryKind::Nym,
        prover.did.clone(),
        prover.verkey.clone(),
    ))?;
    let committed = ledger.drain()?;
    let entry = ledger
        .fetch(&prover.did)?
        .ok_or_else(|| BenchError::Message(format!("ledger demo: {} not found", prover.did)))?;
    if entry.payload != prover.verkey {
        return Err(BenchError::Message(format!(
            "ledger demo: {} resolved to a different verkey",
            prover.did
        )));
    }
    tracing::debug!(did = %prover.did, committed, "ledger demo read back prover nym");
    Ok(())
}

/// Run `demos` in order, stopping at the first failure.
pub fn run_demos(
    ctx: &mut RunContext,
    facade: &ProtocolFacade<'_>,
    demos: &[Demo],
) -> BenchResult<()> {
    for demo in demos {
        let _span = tracing::info_span!("demo", name = demo.as_str()).entered();
        match demo {
            Demo::Anoncreds => anoncreds_demo(ctx, facade)?,
            Demo::Crypto => crypto_demo(ctx)?,
            Demo::Ledger => ledger_demo(ctx)?,
        }
        tracing::info!("demo passed");
    }
    Ok(())
}
