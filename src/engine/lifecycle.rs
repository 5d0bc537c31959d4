//! Resource lifecycle: acquiring and releasing the handles a run needs.
//!
//! `acquire` opens, in order, the wallet, the ledger connection, the issuer
//! identity and the prover identity. Everything acquired so far lives in the
//! `RunContext`, whose `Drop` releases it, so a failure at any step leaves no
//! open handle behind.

use std::collections::BTreeMap;

use crate::backend::{
    BackendConfig, BackendKind, EnterpriseBackend, InMemoryBackend, StorageBackend,
    WalletStorage,
};
use crate::ledger::{LedgerConnector, LedgerPool, LocalLedgerConnector};
use crate::{BenchError, BenchResult};

use super::identity::{Identity, IdentityProvider, Role, WalletIdentityProvider};

/// Handles owned by one benchmark run.
///
/// Valid between `LifecycleManager::acquire` and `release`; after release
/// every accessor fails.
pub struct RunContext {
    backend_kind: BackendKind,
    storage: Option<Box<dyn WalletStorage>>,
    ledger: Option<Box<dyn LedgerPool>>,
    issuer: Option<Identity>,
    prover: Option<Identity>,
    released: bool,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("backend_kind", &self.backend_kind)
            .field("storage", &self.storage.as_ref().map(|s| s.name().to_string()))
            .field("ledger", &self.ledger.as_ref().map(|l| l.name().to_string()))
            .field("issuer", &self.issuer)
            .field("prover", &self.prover)
            .field("released", &self.released)
            .finish()
    }
}

fn released(what: &str) -> BenchError {
    BenchError::Message(format!("{what} is not available: run context released"))
}

impl RunContext {
    fn new(backend_kind: BackendKind) -> Self {
        RunContext {
            backend_kind,
            storage: None,
            ledger: None,
            issuer: None,
            prover: None,
            released: false,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    pub fn storage(&mut self) -> BenchResult<&mut dyn WalletStorage> {
        match self.storage.as_mut() {
            Some(storage) => Ok(&mut **storage),
            None => Err(released("storage")),
        }
    }

    pub fn ledger(&mut self) -> BenchResult<&mut dyn LedgerPool> {
        match self.ledger.as_mut() {
            Some(ledger) => Ok(&mut **ledger),
            None => Err(released("ledger")),
        }
    }

    /// Storage and ledger borrowed together.
    pub fn parts(&mut self) -> BenchResult<(&mut dyn WalletStorage, &mut dyn LedgerPool)> {
        match (self.storage.as_mut(), self.ledger.as_mut()) {
            (Some(storage), Some(ledger)) => Ok((&mut **storage, &mut **ledger)),
            _ => Err(released("storage or ledger")),
        }
    }

    pub fn issuer(&self) -> BenchResult<&Identity> {
        self.issuer.as_ref().ok_or_else(|| released("issuer identity"))
    }

    pub fn prover(&self) -> BenchResult<&Identity> {
        self.prover.as_ref().ok_or_else(|| released("prover identity"))
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release every handle in reverse acquisition order. Idempotent.
    ///
    /// Closing the ledger drains its pending writes; closing the wallet flushes
    /// it. Close failures are logged, not returned.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.prover = None;
        self.issuer = None;
        if let Some(mut ledger) = self.ledger.take() {
            if let Err(e) = ledger.close() {
                tracing::warn!(error = %e, pool = ledger.name(), "failed to close ledger connection");
            }
        }
        if let Some(mut storage) = self.storage.take() {
            if let Err(e) = storage.close() {
                tracing::warn!(error = %e, wallet = storage.name(), "failed to close wallet");
            }
        }
        tracing::debug!(backend = %self.backend_kind, "released run context");
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens and tears down the long-lived resources of a benchmark run.
pub struct LifecycleManager {
    backends: BTreeMap<BackendKind, Box<dyn StorageBackend>>,
    ledger: Box<dyn LedgerConnector>,
    identities: Box<dyn IdentityProvider>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LifecycleManager {
    /// Manager with no storage backends registered.
    pub fn new(ledger: impl LedgerConnector + 'static) -> Self {
        LifecycleManager {
            backends: BTreeMap::new(),
            ledger: Box::new(ledger),
            identities: Box::new(WalletIdentityProvider),
        }
    }

    /// Manager with the in-memory and enterprise backends and a local ledger.
    pub fn builtin() -> Self {
        Self::new(LocalLedgerConnector::default())
            .with_backend(InMemoryBackend::new())
            .with_backend(EnterpriseBackend::new())
    }

    /// Register a backend for its kind, replacing any previous one.
    pub fn with_backend(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.backends.insert(backend.kind(), Box::new(backend));
        self
    }

    pub fn with_ledger(mut self, ledger: impl LedgerConnector + 'static) -> Self {
        self.ledger = Box::new(ledger);
        self
    }

    pub fn with_identity_provider(mut self, identities: impl IdentityProvider + 'static) -> Self {
        self.identities = Box::new(identities);
        self
    }

    /// Acquire storage, ledger, issuer and prover, in that order.
    ///
    /// # Errors
    /// - `BackendUnavailable` if the wallet cannot be opened or the ledger reached
    /// - `IdentityCreationFailed` if either identity cannot be created or loaded
    pub fn acquire(&self, config: &BackendConfig) -> BenchResult<RunContext> {
        let _span = tracing::info_span!("acquire", backend = %config.kind).entered();
        let mut ctx = RunContext::new(config.kind);

        let backend = self.backends.get(&config.kind).ok_or_else(|| {
            BenchError::BackendUnavailable(format!("no storage backend registered for {}", config.kind))
        })?;
        ctx.storage = Some(backend.open(&config.connection_params)?);
        tracing::debug!("wallet opened");

        ctx.ledger = Some(self.ledger.connect()?);
        tracing::debug!("ledger connected");

        let issuer = self.identity(&mut ctx, Role::Issuer)?;
        ctx.issuer = Some(issuer);
        let prover = self.identity(&mut ctx, Role::Prover)?;
        ctx.prover = Some(prover);
        tracing::info!("resources acquired");
        Ok(ctx)
    }

    fn identity(&self, ctx: &mut RunContext, role: Role) -> BenchResult<Identity> {
        let (storage, ledger) = ctx.parts()?;
        self.identities
            .create_or_load(role, storage, ledger)
            .map_err(|e| match e {
                e @ BenchError::IdentityCreationFailed { .. } => e,
                other => BenchError::IdentityCreationFailed {
                    role,
                    reason: other.to_string(),
                },
            })
    }

    /// Release a context. Safe to call more than once.
    pub fn release(&self, ctx: &mut RunContext) {
        ctx.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockStorageBackend, resolve};
    use crate::ledger::LedgerProbe;

    struct FailingIdentities {
        role: Role,
    }

    impl IdentityProvider for FailingIdentities {
        fn create_or_load(
            &self,
            role: Role,
            storage: &mut dyn WalletStorage,
            ledger: &mut dyn LedgerPool,
        ) -> BenchResult<Identity> {
            if role == self.role {
                return Err(BenchError::Message("key generation failed".into()));
            }
            WalletIdentityProvider.create_or_load(role, storage, ledger)
        }
    }

    fn manager(
        storage: MockStorageBackend,
        ledger: LocalLedgerConnector,
    ) -> (LifecycleManager, crate::backend::StorageProbe, LedgerProbe) {
        let sp = storage.probe();
        let lp = ledger.probe();
        (LifecycleManager::new(ledger).with_backend(storage), sp, lp)
    }

    #[test]
    fn test_acquire_populates_all_handles() {
        let (mgr, sp, lp) = manager(
            MockStorageBackend::new(BackendKind::Default),
            LocalLedgerConnector::default(),
        );
        let mut ctx = mgr.acquire(&resolve("default")).unwrap();
        assert!(ctx.storage().is_ok());
        assert!(ctx.ledger().is_ok());
        assert_ne!(ctx.issuer().unwrap().did, ctx.prover().unwrap().did);
        assert_eq!(sp.open_handles(), 1);
        assert_eq!(lp.open_connections(), 1);

        mgr.release(&mut ctx);
        assert_eq!(sp.open_handles(), 0);
        assert_eq!(lp.open_connections(), 0);
        // Issuer NYM drained to the ledger on release
        assert_eq!(lp.drained(), 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mgr, sp, lp) = manager(
            MockStorageBackend::new(BackendKind::Default),
            LocalLedgerConnector::default(),
        );
        let mut ctx = mgr.acquire(&resolve("default")).unwrap();
        mgr.release(&mut ctx);
        mgr.release(&mut ctx);
        drop(ctx);
        assert_eq!(sp.close_calls(), 1);
        assert_eq!(sp.closed(), 1);
        assert_eq!(lp.closed(), 1);
    }

    #[test]
    fn test_accessors_fail_after_release() {
        let mgr = LifecycleManager::builtin();
        let mut ctx = mgr.acquire(&resolve("default")).unwrap();
        ctx.release();
        assert!(ctx.is_released());
        assert!(ctx.storage().is_err());
        assert!(ctx.ledger().is_err());
        assert!(ctx.issuer().is_err());
        assert!(ctx.prover().is_err());
    }

    #[test]
    fn test_drop_releases() {
        let (mgr, sp, lp) = manager(
            MockStorageBackend::new(BackendKind::Default),
            LocalLedgerConnector::default(),
        );
        {
            let _ctx = mgr.acquire(&resolve("default")).unwrap();
        }
        assert_eq!(sp.open_handles(), 0);
        assert_eq!(lp.open_connections(), 0);
    }

    #[test]
    fn test_storage_failure_acquires_nothing() {
        let (mgr, sp, lp) = manager(
            MockStorageBackend::new(BackendKind::Default).open_fails(),
            LocalLedgerConnector::default(),
        );
        let err = mgr.acquire(&resolve("default")).unwrap_err();
        assert!(matches!(err, BenchError::BackendUnavailable(_)));
        assert_eq!(sp.opened(), 0);
        assert_eq!(lp.connected(), 0);
    }

    #[test]
    fn test_ledger_failure_releases_storage() {
        let (mgr, sp, _lp) = manager(
            MockStorageBackend::new(BackendKind::Default),
            LocalLedgerConnector::default().unreachable(),
        );
        let err = mgr.acquire(&resolve("default")).unwrap_err();
        assert!(matches!(err, BenchError::BackendUnavailable(_)));
        assert_eq!(sp.opened(), 1);
        assert_eq!(sp.open_handles(), 0);
    }

    #[test]
    fn test_issuer_failure_releases_storage_and_ledger() {
        let (mgr, sp, lp) = manager(
            MockStorageBackend::new(BackendKind::Default).fail_writes_to("identity"),
            LocalLedgerConnector::default(),
        );
        let err = mgr.acquire(&resolve("default")).unwrap_err();
        assert!(matches!(
            err,
            BenchError::IdentityCreationFailed {
                role: Role::Issuer,
                ..
            }
        ));
        assert_eq!(sp.open_handles(), 0);
        assert_eq!(lp.connected(), 1);
        assert_eq!(lp.open_connections(), 0);
    }

    #[test]
    fn test_prover_failure_releases_everything() {
        let storage = MockStorageBackend::new(BackendKind::Default);
        let ledger = LocalLedgerConnector::default();
        let sp = storage.probe();
        let lp = ledger.probe();
        let mgr = LifecycleManager::new(ledger)
            .with_backend(storage)
            .with_identity_provider(FailingIdentities { role: Role::Prover });

        let err = mgr.acquire(&resolve("default")).unwrap_err();
        match err {
            BenchError::IdentityCreationFailed { role, reason } => {
                assert_eq!(role, Role::Prover);
                assert!(reason.contains("key generation failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sp.open_handles(), 0);
        assert_eq!(lp.open_connections(), 0);
    }

    #[test]
    fn test_unregistered_backend_kind() {
        let mgr = LifecycleManager::new(LocalLedgerConnector::default())
            .with_backend(InMemoryBackend::new());
        let err = mgr.acquire(&resolve("enterprise")).unwrap_err();
        assert!(matches!(err, BenchError::BackendUnavailable(_)));
    }
}
