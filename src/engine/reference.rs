//! Reference credentials engine.
//!
//! A deterministic, hash-based stand-in for an anonymous-credentials engine.
//! It performs the same storage and ledger traffic a real engine does for the
//! `gvt` example credential (schema and credential definition anchored on the
//! ledger, credentials and proof requests stored in the wallet, credential
//! definition read back at verification) but provides no cryptographic
//! security. Use it to compare wallet backends, not to measure proving cost.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::ledger::{EntryKind, LedgerEntry};
use crate::{BenchError, BenchResult, sha256_hex};

use super::facade::{CredentialEngine, CredentialRef, ProofRef, ProofRequestRef};
use super::identity::Identity;
use super::lifecycle::RunContext;

pub const CREDENTIAL_CATEGORY: &str = "credential";
pub const PROOF_REQUEST_CATEGORY: &str = "proof_request";

const SCHEMA_NAME: &str = "gvt";
const SCHEMA_VERSION: &str = "1.0";
const SCHEMA_ATTRS: [&str; 4] = ["name", "sex", "height", "age"];
const CRED_DEF_TAG: &str = "TAG1";
const MIN_AGE: u32 = 18;

#[derive(Debug, Serialize, Deserialize)]
struct CredDefPayload {
    schema_id: String,
    issuer_did: String,
    issuer_verkey: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    cred_def_id: String,
    values: BTreeMap<String, String>,
    signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Predicate {
    attr: String,
    p_type: String,
    p_value: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProofRequest {
    nonce: String,
    revealed: Vec<String>,
    predicate: Predicate,
}

#[derive(Debug, Serialize, Deserialize)]
struct Proof {
    request_id: String,
    nonce: String,
    cred_def_id: String,
    revealed: BTreeMap<String, String>,
    predicate_satisfied: bool,
    commitment: String,
    binding: String,
}

fn encode<T: Serialize>(value: &T) -> BenchResult<String> {
    serde_json::to_string(value).map_err(|e| BenchError::Message(format!("encode failed: {e}")))
}

fn decode<'a, T: Deserialize<'a>>(what: &str, s: &'a str) -> BenchResult<T> {
    serde_json::from_str(s).map_err(|e| BenchError::Message(format!("malformed {what}: {e}")))
}

fn binding(commitment: &str, nonce: &str, cred_def_id: &str, verkey: &str) -> String {
    sha256_hex(format!("{commitment}|{nonce}|{cred_def_id}|{verkey}").as_bytes())
}

/// Hash-based engine over the `gvt` credential schema.
#[derive(Debug)]
pub struct ReferenceEngine {
    instance: String,
    seq: AtomicU64,
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceEngine {
    pub fn new() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        ReferenceEngine {
            instance: format!("{nanos:x}"),
            seq: AtomicU64::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{}-{n}", self.instance)
    }

    fn schema_id(issuer: &Identity) -> String {
        format!("{}:2:{SCHEMA_NAME}:{SCHEMA_VERSION}", issuer.did)
    }

    fn cred_def_id(issuer: &Identity) -> String {
        format!("{}:3:CL:{SCHEMA_NAME}:{SCHEMA_VERSION}:{CRED_DEF_TAG}", issuer.did)
    }

    /// Anchor schema and credential definition unless already on the ledger.
    fn ensure_cred_def(ctx: &mut RunContext, issuer: &Identity) -> BenchResult<String> {
        let cred_def_id = Self::cred_def_id(issuer);
        let ledger = ctx.ledger()?;
        if ledger.fetch(&cred_def_id)?.is_some() {
            return Ok(cred_def_id);
        }
        let schema_id = Self::schema_id(issuer);
        ledger.anchor(LedgerEntry::new(
            EntryKind::Schema,
            schema_id.clone(),
            encode(&SCHEMA_ATTRS)?,
        ))?;
        let payload = CredDefPayload {
            schema_id,
            issuer_did: issuer.did.clone(),
            issuer_verkey: issuer.verkey.clone(),
        };
        ledger.anchor(LedgerEntry::new(
            EntryKind::CredDef,
            cred_def_id.clone(),
            encode(&payload)?,
        ))?;
        tracing::debug!(%cred_def_id, "anchored credential definition");
        Ok(cred_def_id)
    }

    fn load_string(ctx: &mut RunContext, category: &str, id: &str) -> BenchResult<String> {
        let bytes = ctx
            .storage()?
            .get(category, id)?
            .ok_or_else(|| BenchError::Message(format!("{category} {id} not found in wallet")))?;
        String::from_utf8(bytes)
            .map_err(|e| BenchError::Message(format!("{category} {id} is not utf-8: {e}")))
    }
}

impl CredentialEngine for ReferenceEngine {
    fn name(&self) -> &str {
        "reference"
    }

    fn issue_credential(&self, ctx: &mut RunContext) -> BenchResult<CredentialRef> {
        let issuer = ctx.issuer()?.clone();
        let cred_def_id = Self::ensure_cred_def(ctx, &issuer)?;
        let id = self.next_id("cred");

        let age = MIN_AGE + (self.seq.load(Ordering::Relaxed) % 50) as u32;
        let values: BTreeMap<String, String> = [
            ("name", "Alex".to_string()),
            ("sex", "male".to_string()),
            ("height", "175".to_string()),
            ("age", age.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let signature = issuer.sign(format!("{cred_def_id}|{}", encode(&values)?).as_bytes());
        let credential = StoredCredential {
            cred_def_id: cred_def_id.clone(),
            values,
            signature,
        };
        ctx.storage()?
            .add(CREDENTIAL_CATEGORY, &id, encode(&credential)?.as_bytes())?;
        Ok(CredentialRef {
            id,
            body: cred_def_id,
        })
    }

    fn create_proof_request(&self, ctx: &mut RunContext) -> BenchResult<ProofRequestRef> {
        let id = self.next_id("req");
        let request = ProofRequest {
            nonce: sha256_hex(id.as_bytes())[..20].to_string(),
            revealed: vec!["name".to_string()],
            predicate: Predicate {
                attr: "age".to_string(),
                p_type: ">=".to_string(),
                p_value: MIN_AGE,
            },
        };
        let body = encode(&request)?;
        ctx.storage()?
            .add(PROOF_REQUEST_CATEGORY, &id, body.as_bytes())?;
        Ok(ProofRequestRef { id, body })
    }

    fn create_proof(
        &self,
        ctx: &mut RunContext,
        credential: &CredentialRef,
        request: &ProofRequestRef,
    ) -> BenchResult<ProofRef> {
        let stored = Self::load_string(ctx, CREDENTIAL_CATEGORY, &credential.id)?;
        let cred: StoredCredential = decode("credential", &stored)?;
        let req: ProofRequest = decode("proof request", &request.body)?;

        let mut revealed = BTreeMap::new();
        for attr in &req.revealed {
            let value = cred.values.get(attr).ok_or_else(|| {
                BenchError::Message(format!("credential has no attribute '{attr}'"))
            })?;
            revealed.insert(attr.clone(), value.clone());
        }
        let actual: u32 = cred
            .values
            .get(&req.predicate.attr)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                BenchError::Message(format!(
                    "credential attribute '{}' is not numeric",
                    req.predicate.attr
                ))
            })?;
        if req.predicate.p_type != ">=" {
            return Err(BenchError::Message(format!(
                "unsupported predicate type '{}'",
                req.predicate.p_type
            )));
        }
        if actual < req.predicate.p_value {
            return Err(BenchError::Message(format!(
                "predicate {} >= {} not satisfied",
                req.predicate.attr, req.predicate.p_value
            )));
        }

        let issuer_verkey = {
            let entry = ctx.ledger()?.fetch(&cred.cred_def_id)?.ok_or_else(|| {
                BenchError::Message(format!("credential definition {} not on ledger", cred.cred_def_id))
            })?;
            decode::<CredDefPayload>("credential definition", &entry.payload)?.issuer_verkey
        };
        let commitment = sha256_hex(cred.signature.as_bytes());
        let proof = Proof {
            request_id: request.id.clone(),
            nonce: req.nonce.clone(),
            binding: binding(&commitment, &req.nonce, &cred.cred_def_id, &issuer_verkey),
            cred_def_id: cred.cred_def_id,
            revealed,
            predicate_satisfied: true,
            commitment,
        };
        Ok(ProofRef {
            id: self.next_id("proof"),
            body: encode(&proof)?,
        })
    }

    fn verify_proof(&self, ctx: &mut RunContext, proof: &ProofRef) -> BenchResult<bool> {
        let proof: Proof = decode("proof", &proof.body)?;

        let Some(stored_request) = ctx
            .storage()?
            .get(PROOF_REQUEST_CATEGORY, &proof.request_id)?
        else {
            return Ok(false);
        };
        let stored_request = String::from_utf8(stored_request)
            .map_err(|e| BenchError::Message(format!("proof request is not utf-8: {e}")))?;
        let request: ProofRequest = decode("proof request", &stored_request)?;
        if request.nonce != proof.nonce {
            return Ok(false);
        }
        if request.revealed.iter().any(|a| !proof.revealed.contains_key(a)) {
            return Ok(false);
        }

        let Some(entry) = ctx.ledger()?.fetch(&proof.cred_def_id)? else {
            return Ok(false);
        };
        let cred_def: CredDefPayload = decode("credential definition", &entry.payload)?;
        let expected = binding(
            &proof.commitment,
            &proof.nonce,
            &proof.cred_def_id,
            &cred_def.issuer_verkey,
        );
        Ok(proof.predicate_satisfied && expected == proof.binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::resolve;
    use crate::engine::lifecycle::LifecycleManager;

    fn cycle(engine: &ReferenceEngine, ctx: &mut RunContext) -> ProofRef {
        let cred = engine.issue_credential(ctx).unwrap();
        let req = engine.create_proof_request(ctx).unwrap();
        engine.create_proof(ctx, &cred, &req).unwrap()
    }

    #[test]
    fn test_full_cycle_verifies() {
        let engine = ReferenceEngine::new();
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();
        let proof = cycle(&engine, &mut ctx);
        assert!(engine.verify_proof(&mut ctx, &proof).unwrap());
        assert_eq!(ctx.storage().unwrap().count(CREDENTIAL_CATEGORY).unwrap(), 1);
        assert_eq!(ctx.storage().unwrap().count(PROOF_REQUEST_CATEGORY).unwrap(), 1);
    }

    #[test]
    fn test_cred_def_anchored_once() {
        let engine = ReferenceEngine::new();
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();
        let a = engine.issue_credential(&mut ctx).unwrap();
        let b = engine.issue_credential(&mut ctx).unwrap();
        assert_eq!(a.body, b.body);
        assert_ne!(a.id, b.id);
        let issuer = ctx.issuer().unwrap().clone();
        assert!(
            ctx.ledger()
                .unwrap()
                .fetch(&ReferenceEngine::schema_id(&issuer))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_tampered_proof_does_not_verify() {
        let engine = ReferenceEngine::new();
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();
        let proof = cycle(&engine, &mut ctx);

        let mut parsed: Proof = serde_json::from_str(&proof.body).unwrap();
        parsed.commitment = sha256_hex(b"forged");
        let forged = ProofRef {
            id: proof.id.clone(),
            body: serde_json::to_string(&parsed).unwrap(),
        };
        assert!(!engine.verify_proof(&mut ctx, &forged).unwrap());

        let mut parsed: Proof = serde_json::from_str(&proof.body).unwrap();
        parsed.nonce = "replayed".into();
        let replayed = ProofRef {
            id: proof.id,
            body: serde_json::to_string(&parsed).unwrap(),
        };
        assert!(!engine.verify_proof(&mut ctx, &replayed).unwrap());
    }

    #[test]
    fn test_malformed_proof_is_an_error() {
        let engine = ReferenceEngine::new();
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();
        let garbage = ProofRef {
            id: "p".into(),
            body: "not json".into(),
        };
        assert!(engine.verify_proof(&mut ctx, &garbage).is_err());
    }

    #[test]
    fn test_missing_credential_is_an_error() {
        let engine = ReferenceEngine::new();
        let mut ctx = LifecycleManager::builtin().acquire(&resolve("default")).unwrap();
        let req = engine.create_proof_request(&mut ctx).unwrap();
        let ghost = CredentialRef {
            id: "cred-ghost".into(),
            body: String::new(),
        };
        assert!(engine.create_proof(&mut ctx, &ghost, &req).is_err());
    }

    #[test]
    fn test_works_on_enterprise_backend() {
        let dir = tempfile::tempdir().unwrap();
        let selector = crate::backend::BackendSelector::new().with_params(
            crate::backend::BackendKind::Enterprise,
            crate::backend::ConnectionParams::from([(
                crate::backend::selector::PARAM_PATH.to_string(),
                dir.path().to_string_lossy().to_string(),
            )]),
        );
        let engine = ReferenceEngine::new();
        let mut ctx = LifecycleManager::builtin()
            .acquire(&selector.resolve("enterprise"))
            .unwrap();
        let proof = cycle(&engine, &mut ctx);
        assert!(engine.verify_proof(&mut ctx, &proof).unwrap());
    }
}
