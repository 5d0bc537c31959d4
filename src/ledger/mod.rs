//! Ledger / pool connection abstraction.
//!
//! The harness anchors public artifacts (identity NYMs, schemas, credential
//! definitions) on a ledger and reads them back during verification. Consensus
//! is out of scope; only the connection contract lives here.

pub mod local;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::BenchResult;

pub use local::{LedgerProbe, LocalLedger, LocalLedgerConnector};

/// Kind of anchored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Nym,
    Schema,
    CredDef,
    Attrib,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Nym => "nym",
            EntryKind::Schema => "schema",
            EntryKind::CredDef => "cred_def",
            EntryKind::Attrib => "attrib",
        };
        f.write_str(s)
    }
}

/// Entry anchored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub id: String,
    pub payload: String,
}

impl LedgerEntry {
    pub fn new(kind: EntryKind, id: impl Into<String>, payload: impl Into<String>) -> Self {
        LedgerEntry {
            kind,
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// An open ledger connection.
pub trait LedgerPool: Send {
    /// Pool name.
    fn name(&self) -> &str;

    /// Submit an entry. Re-anchoring an identical entry is a no-op; a different
    /// payload under an existing id is rejected.
    fn anchor(&mut self, entry: LedgerEntry) -> BenchResult<()>;

    /// Read an entry, including writes not yet drained by this connection.
    fn fetch(&self, id: &str) -> BenchResult<Option<LedgerEntry>>;

    /// Wait for pending writes to commit. Returns how many were committed.
    fn drain(&mut self) -> BenchResult<usize>;

    fn is_connected(&self) -> bool;

    /// Drain, then disconnect. Idempotent.
    fn close(&mut self) -> BenchResult<()>;
}

/// Opens ledger connections.
pub trait LedgerConnector: Send + Sync {
    fn connect(&self) -> BenchResult<Box<dyn LedgerPool>>;
}
