//! Issuer and prover identities.
//!
//! An identity is loaded from the wallet's `identity` category when present and
//! created from a role-derived seed otherwise. Key material is opaque to the
//! harness; the digests below only give the demos something to sign with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::WalletStorage;
use crate::ledger::{EntryKind, LedgerEntry, LedgerPool};
use crate::{BenchError, BenchResult, sha256_hex};

/// Wallet category holding identity records.
pub const IDENTITY_CATEGORY: &str = "identity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Issuer,
    Prover,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Issuer => "issuer",
            Role::Prover => "prover",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key material references for one party.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub role: Role,
    pub did: String,
    pub verkey: String,
    secret: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("role", &self.role)
            .field("did", &self.did)
            .field("verkey", &self.verkey)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Derive an identity deterministically from a seed.
    pub fn from_seed(role: Role, seed: &str) -> Self {
        let secret = sha256_hex(format!("secret:{seed}").as_bytes());
        let verkey = sha256_hex(format!("verkey:{secret}").as_bytes());
        let did = format!("did:bench:{}", &sha256_hex(verkey.as_bytes())[..22]);
        Identity {
            role,
            did,
            verkey,
            secret,
        }
    }

    /// Keyed digest over `message`.
    pub fn sign(&self, message: &[u8]) -> String {
        let mut buf = Vec::with_capacity(self.secret.len() + message.len());
        buf.extend_from_slice(self.secret.as_bytes());
        buf.extend_from_slice(message);
        sha256_hex(&buf)
    }

    pub fn verify(&self, message: &[u8], signature: &str) -> bool {
        self.sign(message) == signature
    }
}

/// Creates or loads identities during resource acquisition.
pub trait IdentityProvider: Send + Sync {
    fn create_or_load(
        &self,
        role: Role,
        storage: &mut dyn WalletStorage,
        ledger: &mut dyn LedgerPool,
    ) -> BenchResult<Identity>;
}

/// Stores identities in the wallet and anchors the issuer's NYM on the ledger.
#[derive(Debug, Clone, Default)]
pub struct WalletIdentityProvider;

impl WalletIdentityProvider {
    fn load(storage: &dyn WalletStorage, role: Role) -> BenchResult<Option<Identity>> {
        let Some(bytes) = storage.get(IDENTITY_CATEGORY, role.as_str())? else {
            return Ok(None);
        };
        let identity: Identity = serde_json::from_slice(&bytes)
            .map_err(|e| BenchError::Message(format!("corrupt identity record: {e}")))?;
        if identity.role != role {
            return Err(BenchError::Message(format!(
                "identity record for {role} holds a {} identity",
                identity.role
            )));
        }
        Ok(Some(identity))
    }
}

impl IdentityProvider for WalletIdentityProvider {
    fn create_or_load(
        &self,
        role: Role,
        storage: &mut dyn WalletStorage,
        ledger: &mut dyn LedgerPool,
    ) -> BenchResult<Identity> {
        let identity = match Self::load(storage, role)? {
            Some(identity) => {
                tracing::debug!(%role, did = %identity.did, "loaded identity from wallet");
                identity
            }
            None => {
                let seed = format!("anoncreds-bench:{role}:{}", storage.name());
                let identity = Identity::from_seed(role, &seed);
                let bytes = serde_json::to_vec(&identity)
                    .map_err(|e| BenchError::Message(format!("failed to encode identity: {e}")))?;
                storage.add(IDENTITY_CATEGORY, role.as_str(), &bytes)?;
                tracing::debug!(%role, did = %identity.did, "created identity");
                identity
            }
        };
        if role == Role::Issuer {
            ledger.anchor(LedgerEntry::new(
                EntryKind::Nym,
                identity.did.clone(),
                identity.verkey.clone(),
            ))?;
        }
        Ok(identity)
    }
}
