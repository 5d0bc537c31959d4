//! In-process ledger used for benchmarks and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{BenchError, BenchResult};

use super::{LedgerConnector, LedgerEntry, LedgerPool};

type Committed = Arc<Mutex<BTreeMap<String, LedgerEntry>>>;

/// Shared counters observing connections from a `LocalLedgerConnector`.
#[derive(Debug, Clone, Default)]
pub struct LedgerProbe {
    connected: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    drained: Arc<AtomicUsize>,
}

impl LedgerProbe {
    pub fn connected(&self) -> usize {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Total entries committed through `drain`.
    pub fn drained(&self) -> usize {
        self.drained.load(Ordering::SeqCst)
    }

    pub fn open_connections(&self) -> usize {
        self.connected().saturating_sub(self.closed())
    }
}

/// Connector to an in-process ledger shared by all its connections.
#[derive(Debug, Clone)]
pub struct LocalLedgerConnector {
    pool_name: String,
    committed: Committed,
    probe: LedgerProbe,
    unreachable: bool,
}

impl Default for LocalLedgerConnector {
    fn default() -> Self {
        Self::new("sandbox")
    }
}

impl LocalLedgerConnector {
    pub fn new(pool_name: impl Into<String>) -> Self {
        LocalLedgerConnector {
            pool_name: pool_name.into(),
            committed: Arc::default(),
            probe: LedgerProbe::default(),
            unreachable: false,
        }
    }

    /// Make `connect` fail with `BackendUnavailable`.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn probe(&self) -> LedgerProbe {
        self.probe.clone()
    }

    /// Number of committed entries.
    pub fn committed_len(&self) -> usize {
        self.committed.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl LedgerConnector for LocalLedgerConnector {
    fn connect(&self) -> BenchResult<Box<dyn LedgerPool>> {
        if self.unreachable {
            return Err(BenchError::BackendUnavailable(format!(
                "ledger pool '{}' unreachable",
                self.pool_name
            )));
        }
        self.probe.connected.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(pool = %self.pool_name, "connected to local ledger");
        Ok(Box::new(LocalLedger {
            pool_name: self.pool_name.clone(),
            committed: self.committed.clone(),
            pending: Vec::new(),
            probe: self.probe.clone(),
            connected: true,
        }))
    }
}

/// Connection to a local ledger. Writes are buffered until drained.
#[derive(Debug)]
pub struct LocalLedger {
    pool_name: String,
    committed: Committed,
    pending: Vec<LedgerEntry>,
    probe: LedgerProbe,
    connected: bool,
}

impl LocalLedger {
    fn ensure_connected(&self) -> BenchResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(BenchError::Message(format!(
                "ledger pool '{}' is closed",
                self.pool_name
            )))
        }
    }

    fn committed_entry(&self, id: &str) -> BenchResult<Option<LedgerEntry>> {
        let committed = self
            .committed
            .lock()
            .map_err(|_| BenchError::Message("ledger state poisoned".into()))?;
        Ok(committed.get(id).cloned())
    }
}

impl LedgerPool for LocalLedger {
    fn name(&self) -> &str {
        &self.pool_name
    }

    fn anchor(&mut self, entry: LedgerEntry) -> BenchResult<()> {
        self.ensure_connected()?;
        if let Some(existing) = self.fetch(&entry.id)? {
            if existing == entry {
                return Ok(());
            }
            return Err(BenchError::Message(format!(
                "ledger entry {} already anchored with a different payload",
                entry.id
            )));
        }
        self.pending.push(entry);
        Ok(())
    }

    fn fetch(&self, id: &str) -> BenchResult<Option<LedgerEntry>> {
        self.ensure_connected()?;
        if let Some(entry) = self.pending.iter().rev().find(|e| e.id == id) {
            return Ok(Some(entry.clone()));
        }
        self.committed_entry(id)
    }

    fn drain(&mut self) -> BenchResult<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let mut committed = self
            .committed
            .lock()
            .map_err(|_| BenchError::Message("ledger state poisoned".into()))?;
        let n = self.pending.len();
        for entry in self.pending.drain(..) {
            committed.insert(entry.id.clone(), entry);
        }
        self.probe.drained.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close(&mut self) -> BenchResult<()> {
        if !self.connected {
            return Ok(());
        }
        let drained = self.drain();
        self.connected = false;
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(pool = %self.pool_name, "closed local ledger connection");
        drained.map(|_| ())
    }
}
