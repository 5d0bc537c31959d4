//! Storage backend trait and wallet handle contract.

use std::collections::BTreeMap;

use crate::BenchResult;

use super::selector::BackendKind;

/// Connection parameters passed to `StorageBackend::open`.
pub type ConnectionParams = BTreeMap<String, String>;

/// Connection parameter naming the wallet to open or create.
pub const PARAM_WALLET_NAME: &str = "wallet_name";
/// Connection parameter that, when `"true"`, wipes an existing wallet on open.
pub const PARAM_FRESH: &str = "fresh";

/// Wallet name used when the connection parameters do not name one.
pub const DEFAULT_WALLET_NAME: &str = "bench_wallet";

/// An open wallet.
///
/// Records are addressed by `(category, id)`. A closed wallet rejects every
/// record operation; `close` itself may be called any number of times.
pub trait WalletStorage: Send {
    /// Backend kind that produced this handle.
    fn kind(&self) -> BackendKind;

    /// Wallet name.
    fn name(&self) -> &str;

    /// Add a new record. Fails if the record already exists.
    fn add(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()>;

    /// Fetch a record value, `None` when absent.
    fn get(&self, category: &str, id: &str) -> BenchResult<Option<Vec<u8>>>;

    /// Replace an existing record value. Fails if the record is missing.
    fn update(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()>;

    /// Delete a record, returning whether it existed.
    fn delete(&mut self, category: &str, id: &str) -> BenchResult<bool>;

    /// Number of records in a category.
    fn count(&self, category: &str) -> BenchResult<usize>;

    /// Wallet-level metadata.
    fn metadata(&self) -> BenchResult<Option<String>>;

    fn set_metadata(&mut self, metadata: &str) -> BenchResult<()>;

    fn is_open(&self) -> bool;

    /// Flush pending state and close. Idempotent.
    fn close(&mut self) -> BenchResult<()>;
}

/// A storage backend that can open wallets.
pub trait StorageBackend: Send + Sync {
    /// Kind of wallets this backend opens.
    fn kind(&self) -> BackendKind;

    /// Open (creating if needed) the wallet described by `params`.
    ///
    /// Fails with `BenchError::BackendUnavailable` when the store cannot be reached.
    fn open(&self, params: &ConnectionParams) -> BenchResult<Box<dyn WalletStorage>>;
}

/// Wallet name from connection parameters, falling back to the default.
pub fn wallet_name(params: &ConnectionParams) -> &str {
    params
        .get(PARAM_WALLET_NAME)
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_WALLET_NAME)
}

/// Whether the parameters ask for a wiped wallet.
pub fn wants_fresh(params: &ConnectionParams) -> bool {
    params
        .get(PARAM_FRESH)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
