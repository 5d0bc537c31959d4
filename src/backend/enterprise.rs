//! Durable file-backed storage backend (`enterprise` wallet type).
//!
//! Layout under the configured root:
//!
//! ```text
//! <path>/<wallet_name>/metadata.json
//! <path>/<wallet_name>/records/<sha256(category)>/<sha256(id)>
//! ```
//!
//! Every write goes to disk before returning, so the measured latency includes
//! real I/O on the persistence path. Metadata is buffered and flushed on close.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{BenchError, BenchResult, sha256_hex};

use super::selector::{BackendKind, PARAM_PATH};
use super::traits::{ConnectionParams, StorageBackend, WalletStorage, wallet_name, wants_fresh};

const METADATA_FILE: &str = "metadata.json";
const RECORDS_DIR: &str = "records";

/// A wallet name must stay a single directory directly under the root.
fn checked_wallet_name(name: &str) -> BenchResult<&str> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
        || Path::new(trimmed).is_absolute();
    if invalid {
        return Err(BenchError::BackendUnavailable(format!(
            "invalid wallet name {name:?}: expected a single path component"
        )));
    }
    Ok(trimmed)
}

/// File-backed wallet store.
#[derive(Debug, Clone, Default)]
pub struct EnterpriseBackend;

impl EnterpriseBackend {
    pub fn new() -> Self {
        EnterpriseBackend
    }
}

impl StorageBackend for EnterpriseBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Enterprise
    }

    fn open(&self, params: &ConnectionParams) -> BenchResult<Box<dyn WalletStorage>> {
        let root = params
            .get(PARAM_PATH)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                BenchError::BackendUnavailable(format!(
                    "enterprise backend requires a `{PARAM_PATH}` connection parameter"
                ))
            })?;
        let name = checked_wallet_name(wallet_name(params))?.to_string();
        let dir = Path::new(root).join(&name);

        if wants_fresh(params) && dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| {
                BenchError::BackendUnavailable(format!(
                    "failed to reset wallet {}: {e}",
                    dir.display()
                ))
            })?;
        }
        fs::create_dir_all(dir.join(RECORDS_DIR)).map_err(|e| {
            BenchError::BackendUnavailable(format!(
                "failed to create wallet {}: {e}",
                dir.display()
            ))
        })?;

        let metadata = match fs::read_to_string(dir.join(METADATA_FILE)) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(BenchError::BackendUnavailable(format!(
                    "failed to read wallet metadata: {e}"
                )));
            }
        };

        tracing::debug!(wallet = %name, dir = %dir.display(), "opened enterprise wallet");
        Ok(Box::new(EnterpriseWallet {
            name,
            dir,
            metadata,
            metadata_dirty: false,
            open: true,
        }))
    }
}

/// Handle to a file-backed wallet.
#[derive(Debug)]
pub struct EnterpriseWallet {
    name: String,
    dir: PathBuf,
    metadata: Option<String>,
    metadata_dirty: bool,
    open: bool,
}

impl EnterpriseWallet {
    fn ensure_open(&self) -> BenchResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(BenchError::Message(format!("wallet '{}' is closed", self.name)))
        }
    }

    fn category_dir(&self, category: &str) -> PathBuf {
        self.dir.join(RECORDS_DIR).join(sha256_hex(category.as_bytes()))
    }

    fn record_path(&self, category: &str, id: &str) -> PathBuf {
        self.category_dir(category).join(sha256_hex(id.as_bytes()))
    }

    fn write_record(&self, path: &Path, value: &[u8]) -> BenchResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
        }
        fs::write(path, value)
            .map_err(|e| BenchError::Message(format!("failed to write record: {e}")))
    }

    fn flush_metadata(&mut self) -> BenchResult<()> {
        if let (true, Some(metadata)) = (self.metadata_dirty, &self.metadata) {
            fs::write(self.dir.join(METADATA_FILE), metadata)
                .map_err(|e| BenchError::Message(format!("failed to write metadata: {e}")))?;
            self.metadata_dirty = false;
        }
        Ok(())
    }
}

impl WalletStorage for EnterpriseWallet {
    fn kind(&self) -> BackendKind {
        BackendKind::Enterprise
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()> {
        self.ensure_open()?;
        let path = self.record_path(category, id);
        if path.exists() {
            return Err(BenchError::Message(format!(
                "record {category}/{id} already exists"
            )));
        }
        self.write_record(&path, value)
    }

    fn get(&self, category: &str, id: &str) -> BenchResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        match fs::read(self.record_path(category, id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BenchError::Message(format!("failed to read record: {e}"))),
        }
    }

    fn update(&mut self, category: &str, id: &str, value: &[u8]) -> BenchResult<()> {
        self.ensure_open()?;
        let path = self.record_path(category, id);
        if !path.exists() {
            return Err(BenchError::Message(format!("record {category}/{id} not found")));
        }
        self.write_record(&path, value)
    }

    fn delete(&mut self, category: &str, id: &str) -> BenchResult<bool> {
        self.ensure_open()?;
        match fs::remove_file(self.record_path(category, id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BenchError::Message(format!("failed to delete record: {e}"))),
        }
    }

    fn count(&self, category: &str) -> BenchResult<usize> {
        self.ensure_open()?;
        match fs::read_dir(self.category_dir(category)) {
            Ok(entries) => Ok(entries.filter_map(|e| e.ok()).count()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(BenchError::Message(format!("failed to list records: {e}"))),
        }
    }

    fn metadata(&self) -> BenchResult<Option<String>> {
        self.ensure_open()?;
        Ok(self.metadata.clone())
    }

    fn set_metadata(&mut self, metadata: &str) -> BenchResult<()> {
        self.ensure_open()?;
        self.metadata = Some(metadata.to_string());
        self.metadata_dirty = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> BenchResult<()> {
        if !self.open {
            return Ok(());
        }
        let flushed = self.flush_metadata();
        self.open = false;
        tracing::debug!(wallet = %self.name, "closed enterprise wallet");
        flushed
    }
}
