use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendKind, BackendSelector, ConnectionParams};
use crate::engine::{Demo, HarnessOptions};
use crate::{BenchError, BenchResult};

pub const DEFAULT_ITERATIONS: u32 = 10;

/// Typed harness configuration, validated before a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Wallet type identifier; unknown values fall back to `default`
    pub backend: String,
    pub iterations: u32,
    pub warmup: u32,
    pub time_issuance: bool,
    pub demos: bool,
    /// Connection parameter overrides keyed by backend kind
    #[serde(skip)]
    pub backends: BTreeMap<String, ConnectionParams>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            backend: BackendKind::Default.to_string(),
            iterations: DEFAULT_ITERATIONS,
            warmup: 0,
            time_issuance: false,
            demos: true,
            backends: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    harness: HarnessConfig,
    #[serde(default)]
    backends: BTreeMap<String, ConnectionParams>,
}

impl HarnessConfig {
    /// Parse a TOML document with optional `[harness]` and `[backends.<kind>]` tables.
    pub fn from_toml_str(s: &str) -> BenchResult<Self> {
        let file: ConfigFile =
            toml::from_str(s).map_err(|e| BenchError::Message(format!("invalid config: {e}")))?;
        let mut config = file.harness;
        config.backends = file.backends;
        Ok(config)
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Message(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&s)
    }

    /// Reject values no run can proceed with.
    pub fn validate(&self) -> BenchResult<()> {
        if self.iterations == 0 {
            return Err(BenchError::Message("iterations must be at least 1".into()));
        }
        for name in self.backends.keys() {
            if BackendKind::from_identifier(name).is_none() {
                return Err(BenchError::Message(format!(
                    "[backends.{name}]: unknown backend kind"
                )));
            }
        }
        if BackendKind::from_identifier(&self.backend).is_none() {
            tracing::warn!(backend = %self.backend, "unrecognized wallet type, the run will use `default`");
        }
        Ok(())
    }

    /// Selector carrying the configured connection parameter overrides.
    pub fn selector(&self) -> BenchResult<BackendSelector> {
        let mut selector = BackendSelector::new();
        for (name, params) in &self.backends {
            let kind = BackendKind::from_identifier(name).ok_or_else(|| {
                BenchError::Message(format!("[backends.{name}]: unknown backend kind"))
            })?;
            selector = selector.with_params(kind, params.clone());
        }
        Ok(selector)
    }

    pub fn harness_options(&self) -> HarnessOptions {
        HarnessOptions {
            warmup: self.warmup,
            time_issuance: self.time_issuance,
            demos: if self.demos { Demo::ALL.to_vec() } else { Vec::new() },
            ..HarnessOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::selector::PARAM_PATH;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_document() {
        let config = HarnessConfig::from_toml_str(
            r#"
            [harness]
            backend = "enterprise"
            iterations = 25
            warmup = 3
            time_issuance = true
            demos = false

            [backends.enterprise]
            path = "/srv/wallets"
            wallet_name = "perf"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, "enterprise");
        assert_eq!(config.iterations, 25);
        assert!(config.time_issuance);
        config.validate().unwrap();

        let resolved = config.selector().unwrap().resolve(&config.backend);
        assert_eq!(resolved.kind, BackendKind::Enterprise);
        assert_eq!(resolved.param(PARAM_PATH), Some("/srv/wallets"));
        assert_eq!(resolved.param("wallet_name"), Some("perf"));

        let options = config.harness_options();
        assert_eq!(options.warmup, 3);
        assert!(options.demos.is_empty());
    }

    #[test]
    fn test_zero_iterations_invalid() {
        let config = HarnessConfig {
            iterations: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_table_invalid() {
        let config = HarnessConfig::from_toml_str("[backends.postgres]\nurl = \"x\"\n").unwrap();
        assert!(config.validate().is_err());
        assert!(config.selector().is_err());
    }

    #[test]
    fn test_unknown_wallet_type_is_not_an_error() {
        let config = HarnessConfig::from_toml_str("[harness]\nbackend = \"typo\"\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(HarnessConfig::from_toml_str("[harness]\niteration = 5\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(&path, "[harness]\niterations = 7\n").unwrap();
        assert_eq!(HarnessConfig::load(&path).unwrap().iterations, 7);
        assert!(HarnessConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
