//! Wallet storage backends and backend selection.
//!
//! A `StorageBackend` opens `WalletStorage` handles; `BackendSelector` turns a
//! wallet-type identifier into the `BackendConfig` the lifecycle manager opens.

pub mod enterprise;
pub mod inmem;
pub mod mock;
pub mod selector;
pub mod traits;

// Re-export key types
pub use enterprise::EnterpriseBackend;
pub use inmem::InMemoryBackend;
pub use mock::{MockStorageBackend, StorageProbe};
pub use selector::{BackendConfig, BackendKind, BackendSelector, default_params, resolve};
pub use traits::{ConnectionParams, StorageBackend, WalletStorage};

