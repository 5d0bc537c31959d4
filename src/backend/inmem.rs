//! In-memory storage backend (`default` wallet type).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{BenchError, BenchResult};

use super::selector::BackendKind;
use super::traits::{ConnectionParams, StorageBackend, WalletStorage, wallet_name, wants_fresh};

#[derive(Debug, Default)]
struct WalletData {
    records: BTreeMap<(String, String), Vec<u8>>,
    metadata: Option<String>,
}

type SharedWallet = Arc<Mutex<WalletData>>;

/// Process-local wallet store.
///
/// Wallets live as long as the backend value. Reopening a wallet by name sees
/// the records written before, unless `fresh` is requested.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    wallets: Arc<Mutex<HashMap<String, SharedWallet>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of wallets created so far.
    pub fn wallet_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .wallets
            .lock()
            .map(|w| w.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Default
    }

    fn open(&self, params: &ConnectionParams) -> BenchResult<Box<dyn WalletStorage>> {
        let name = wallet_name(params).to_string();
        let mut wallets = self
            .wallets
            .lock()
            .map_err(|_| BenchError::BackendUnavailable("in-memory wallet registry poisoned".into()))?;
        if wants_fresh(params) {
            wallets.remove(&name);
        }
        let data = wallets.entry(name.clone()).or_default().clone();
        tracing::debug!(wallet = %name, "opened in-memory wallet");
        Ok(Box::new(InMemoryWallet {
            name,
            data,
            open: true,
        }))
    }
}

/// Handle to an in-memory wallet.
#[derive(Debug)]
pub struct InMemoryWallet {
    name: String,
    data: SharedWallet,
    open: bool,
}

impl InMemoryWallet {
    fn data(&self) -> BenchResult<MutexGuard<'_, WalletData>> {
        if !self.open {
            return Err(BenchError::Message(format!("wallet '{}' is closed", self.name)));
        }
        self.data
            .lock()
            .map_err(|_| BenchError::Message(format!("wallet '{}' lock poisoned", self.name)))
    }
}

fn key(category: &str, id: &str) -> (String, String) {
    (category.to_string(), id.to_string())
}

impl WalletStorage for InMemoryWallet {
    fn kind(&self) -> BackendKind {
        BackendKind::Default
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()> {
        let mut data = self.data()?;
        let k = key(category, id);
        if data.records.contains_key(&k) {
            return Err(BenchError::Message(format!(
                "record {category}/{id} already exists"
            )));
        }
        data.records.insert(k, value.to_vec());
        Ok(())
    }

    fn get(&self, category: &str, id: &str) -> BenchResult<Option<Vec<u8>>> {
        Ok(self.data()?.records.get(&key(category, id)).cloned())
    }

    fn update(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()> {
        let mut data = self.data()?;
        match data.records.get_mut(&key(category, id)) {
            Some(slot) => {
                *slot = value.to_vec();
                Ok(())
            }
            None => Err(BenchError::Message(format!("record {category}/{id} not found"))),
        }
    }

    fn delete(&mut self, category: &str, id: &str) -> BenchResult<bool> {
        Ok(self.data()?.records.remove(&key(category, id)).is_some())
    }

    fn count(&self, category: &str) -> BenchResult<usize> {
        Ok(self
            .data()?
            .records
            .keys()
            .filter(|(c, _)| c == category)
            .count())
    }

    fn metadata(&self) -> BenchResult<Option<String>> {
        Ok(self.data()?.metadata.clone())
    }

    fn set_metadata(&mut self, metadata: &str) -> BenchResult<()> {
        self.data()?.metadata = Some(metadata.to_string());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> BenchResult<()> {
        if self.open {
            self.open = false;
            tracing::debug!(wallet = %self.name, "closed in-memory wallet");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::{PARAM_FRESH, PARAM_WALLET_NAME};

    fn params(name: &str) -> ConnectionParams {
        ConnectionParams::from([(PARAM_WALLET_NAME.to_string(), name.to_string())])
    }

    #[test]
    fn test_add_get_update_delete() {
        let backend = InMemoryBackend::new();
        let mut w = backend.open(&params("w1")).unwrap();
        w.add("credential", "c1", b"v1").unwrap();
        assert!(w.add("credential", "c1", b"dup").is_err());
        assert_eq!(w.get("credential", "c1").unwrap(), Some(b"v1".to_vec()));
        w.update("credential", "c1", b"v2").unwrap();
        assert_eq!(w.get("credential", "c1").unwrap(), Some(b"v2".to_vec()));
        assert!(w.update("credential", "missing", b"x").is_err());
        assert_eq!(w.count("credential").unwrap(), 1);
        assert!(w.delete("credential", "c1").unwrap());
        assert!(!w.delete("credential", "c1").unwrap());
        assert_eq!(w.get("credential", "c1").unwrap(), None);
    }

    #[test]
    fn test_reopen_sees_records_unless_fresh() {
        let backend = InMemoryBackend::new();
        let mut w = backend.open(&params("w1")).unwrap();
        w.add("identity", "issuer", b"key").unwrap();
        w.close().unwrap();

        let w2 = backend.open(&params("w1")).unwrap();
        assert_eq!(w2.get("identity", "issuer").unwrap(), Some(b"key".to_vec()));

        let mut fresh = params("w1");
        fresh.insert(PARAM_FRESH.into(), "true".into());
        let w3 = backend.open(&fresh).unwrap();
        assert_eq!(w3.get("identity", "issuer").unwrap(), None);
        assert_eq!(backend.wallet_names(), vec!["w1".to_string()]);
    }

    #[test]
    fn test_closed_wallet_rejects_operations_and_close_is_idempotent() {
        let backend = InMemoryBackend::new();
        let mut w = backend.open(&params("w1")).unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert!(!w.is_open());
        assert!(w.get("a", "b").is_err());
        assert!(w.add("a", "b", b"c").is_err());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let backend = InMemoryBackend::new();
        let mut w = backend.open(&params("w1")).unwrap();
        assert_eq!(w.metadata().unwrap(), None);
        w.set_metadata("{\"version\":1}").unwrap();
        assert_eq!(w.metadata().unwrap().as_deref(), Some("{\"version\":1}"));
    }
}
