//! Backend selection: wallet-type identifier to `BackendConfig`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::traits::{ConnectionParams, DEFAULT_WALLET_NAME, PARAM_FRESH, PARAM_WALLET_NAME};

/// Connection parameter holding the enterprise store root directory.
pub const PARAM_PATH: &str = "path";

/// Storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Default,
    Enterprise,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Default => "default",
            BackendKind::Enterprise => "enterprise",
        }
    }

    /// Parse a recognized identifier. Case and surrounding whitespace are ignored.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier.trim().to_ascii_lowercase().as_str() {
            "default" => Some(BackendKind::Default),
            "enterprise" => Some(BackendKind::Enterprise),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved backend configuration. Never mutated after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub connection_params: ConnectionParams,
}

impl BackendConfig {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.connection_params.get(key).map(String::as_str)
    }
}

/// Built-in connection parameters for a backend kind.
pub fn default_params(kind: BackendKind) -> ConnectionParams {
    let mut params = ConnectionParams::new();
    params.insert(PARAM_WALLET_NAME.to_string(), DEFAULT_WALLET_NAME.to_string());
    // Every run starts from an empty wallet unless overridden
    params.insert(PARAM_FRESH.to_string(), "true".to_string());
    if kind == BackendKind::Enterprise {
        let root = std::env::temp_dir().join("anoncreds-bench").join("wallets");
        params.insert(PARAM_PATH.to_string(), root.to_string_lossy().to_string());
    }
    params
}

/// Maps wallet-type identifiers to backend configurations.
///
/// Unknown identifiers resolve to `BackendKind::Default`.
#[derive(Debug, Clone, Default)]
pub struct BackendSelector {
    overrides: BTreeMap<BackendKind, ConnectionParams>,
}

impl BackendSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge connection parameters over the built-in defaults for `kind`.
    pub fn with_params(mut self, kind: BackendKind, params: ConnectionParams) -> Self {
        self.overrides.entry(kind).or_default().extend(params);
        self
    }

    pub fn resolve(&self, identifier: &str) -> BackendConfig {
        let kind = BackendKind::from_identifier(identifier).unwrap_or_else(|| {
            tracing::warn!(
                identifier,
                "unknown wallet type, falling back to `{}`",
                BackendKind::Default
            );
            BackendKind::Default
        });
        let mut connection_params = default_params(kind);
        if let Some(extra) = self.overrides.get(&kind) {
            connection_params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        BackendConfig {
            kind,
            connection_params,
        }
    }
}

/// Resolve an identifier with built-in parameters only.
pub fn resolve(identifier: &str) -> BackendConfig {
    BackendSelector::new().resolve(identifier)
}
