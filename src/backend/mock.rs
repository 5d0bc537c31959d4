//! Mock storage backend for testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{BenchError, BenchResult};

use super::inmem::InMemoryBackend;
use super::selector::BackendKind;
use super::traits::{ConnectionParams, StorageBackend, WalletStorage};

/// Shared counters observing wallet handles opened by a `MockStorageBackend`.
#[derive(Debug, Clone, Default)]
pub struct StorageProbe {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
}

impl StorageProbe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Handles that transitioned from open to closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Every `close` call, including repeats on an already closed handle.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Handles still open.
    pub fn open_handles(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

/// Mock backend wrapping an in-memory store with failure injection.
#[derive(Debug, Clone)]
pub struct MockStorageBackend {
    kind: BackendKind,
    inner: InMemoryBackend,
    probe: StorageProbe,
    open_fails: bool,
    failing_category: Option<String>,
}

impl MockStorageBackend {
    pub fn new(kind: BackendKind) -> Self {
        MockStorageBackend {
            kind,
            inner: InMemoryBackend::new(),
            probe: StorageProbe::default(),
            open_fails: false,
            failing_category: None,
        }
    }

    /// Make `open` fail with `BackendUnavailable`.
    pub fn open_fails(mut self) -> Self {
        self.open_fails = true;
        self
    }

    /// Make every write to `category` fail.
    pub fn fail_writes_to(mut self, category: impl Into<String>) -> Self {
        self.failing_category = Some(category.into());
        self
    }

    pub fn probe(&self) -> StorageProbe {
        self.probe.clone()
    }
}

impl StorageBackend for MockStorageBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn open(&self, params: &ConnectionParams) -> BenchResult<Box<dyn WalletStorage>> {
        if self.open_fails {
            return Err(BenchError::BackendUnavailable("mock storage unreachable".into()));
        }
        let inner = self.inner.open(params)?;
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockWallet {
            kind: self.kind,
            inner,
            probe: self.probe.clone(),
            failing_category: self.failing_category.clone(),
        }))
    }
}

struct MockWallet {
    kind: BackendKind,
    inner: Box<dyn WalletStorage>,
    probe: StorageProbe,
    failing_category: Option<String>,
}

impl MockWallet {
    fn check_write(&self, category: &str) -> BenchResult<()> {
        if self.failing_category.as_deref() == Some(category) {
            return Err(BenchError::Message(format!("mock write to '{category}' failed")));
        }
        Ok(())
    }
}

impl WalletStorage for MockWallet {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn add(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()> {
        self.check_write(category)?;
        self.inner.add(category, id, value)
    }

    fn get(&self, category: &str, id: &str) -> BenchResult<Option<Vec<u8>>> {
        self.inner.get(category, id)
    }

    fn update(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()> {
        self.check_write(category)?;
        self.inner.update(category, id, value)
    }

    fn delete(&mut self, category: &str, id: &str) -> BenchResult<bool> {
        self.inner.delete(category, id)
    }

    fn count(&self, category: &str) -> BenchResult<usize> {
        self.inner.count(category)
    }

    fn metadata(&self) -> BenchResult<Option<String>> {
        self.inner.metadata()
    }

    fn set_metadata(&mut self, metadata: &str) -> BenchResult<()> {
        self.inner.set_metadata(metadata)
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> BenchResult<()> {
        self.probe.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.is_open() {
            self.probe.closed.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.close()
    }
}
