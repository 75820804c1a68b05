//! Per-store persistence configuration and environment-resolved defaults.
//!
//! [`PersistConfig`] is supplied once at store-definition time and gates
//! everything the adapter does. Hosts embedding dynamic configuration
//! (options deserialized from JSON) go through
//! [`PersistConfig::from_value`], which tolerates a malformed `keys`
//! shape the same way the rest of the crate degrades: warn and fall back.
//!
//! [`PersistSettings`] resolves crate-wide defaults from environment
//! variables (or a `.env` file via `dotenvy`), 12-factor style. The
//! default storage medium is an explicit resolved value handed to
//! [`crate::persistence::PersistenceAdapter::new`] — never a hidden
//! module-level singleton.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::domain::StoreId;
use crate::persistence::medium::{FileMedium, MemoryMedium, StorageMedium};

/// Environment variable naming the snapshot directory for the default
/// file medium. Unset means snapshots default to process memory.
pub const STORAGE_DIR_ENV: &str = "STORE_MIRROR_DIR";

/// Per-store persistence settings.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// Master gate: when `false` the adapter performs no storage access
    /// at all for this store.
    pub enabled: bool,

    /// Verbose sync logging: when `true`, every snapshot write is traced
    /// at debug level. Not functionally load-bearing.
    pub log: bool,

    /// Restrict persistence to these fields. `None` persists the full
    /// state.
    pub keys: Option<Vec<String>>,

    /// Storage medium override for this store. `None` resolves to the
    /// adapter's default medium.
    pub storage: Option<Arc<dyn StorageMedium>>,

    /// Encryption passphrase; presence turns on snapshot encryption.
    pub encryption_key: Option<String>,

    /// Whether the sync subscription survives store teardown.
    pub detached: bool,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log: false,
            keys: None,
            storage: None,
            encryption_key: None,
            detached: true,
        }
    }
}

impl PersistConfig {
    /// Creates a config with persistence enabled and every other option
    /// at its default.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Parses the dynamic option surface from a raw JSON object.
    ///
    /// Recognized fields: `enabled`, `log`, `keys`, `encryptionKey`,
    /// `detached`. Unrecognized fields are ignored. A `keys` value that
    /// is not a list of strings emits a
    /// [`Diagnostic::MalformedKeys`] warning and behaves as if no filter
    /// were configured. A storage medium cannot be carried in JSON, so
    /// `storage` is always `None` here.
    #[must_use]
    pub fn from_value(store_id: &StoreId, raw: &Value, sink: &dyn DiagnosticsSink) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };

        let keys = match obj.get("keys") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let names: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(ToString::to_string))
                    .collect();
                match names {
                    Some(names) => Some(names),
                    None => {
                        sink.emit(Diagnostic::MalformedKeys {
                            store_id: store_id.clone(),
                        });
                        None
                    }
                }
            }
            Some(_) => {
                sink.emit(Diagnostic::MalformedKeys {
                    store_id: store_id.clone(),
                });
                None
            }
        };

        Self {
            enabled: obj.get("enabled").and_then(Value::as_bool).unwrap_or(false),
            log: obj.get("log").and_then(Value::as_bool).unwrap_or(false),
            keys,
            storage: None,
            encryption_key: obj
                .get("encryptionKey")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            detached: obj.get("detached").and_then(Value::as_bool).unwrap_or(true),
        }
    }
}

/// Crate-wide settings resolved from the environment.
#[derive(Debug, Clone, Default)]
pub struct PersistSettings {
    /// Directory for the default file medium; `None` selects the
    /// in-memory medium.
    pub storage_dir: Option<PathBuf>,
}

impl PersistSettings {
    /// Loads settings from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file,
    /// then reads [`STORAGE_DIR_ENV`]. Empty values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let storage_dir = std::env::var(STORAGE_DIR_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Self { storage_dir }
    }

    /// Resolves the default storage medium these settings describe:
    /// a [`FileMedium`] under `storage_dir` when set, otherwise a
    /// process-local [`MemoryMedium`].
    #[must_use]
    pub fn default_medium(&self) -> Arc<dyn StorageMedium> {
        match &self.storage_dir {
            Some(dir) => Arc::new(FileMedium::new(dir)),
            None => Arc::new(MemoryMedium::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use serde_json::json;

    fn id() -> StoreId {
        StoreId::new("settings")
    }

    #[test]
    fn defaults_are_inert_and_detached() {
        let config = PersistConfig::default();
        assert!(!config.enabled);
        assert!(!config.log);
        assert!(config.keys.is_none());
        assert!(config.storage.is_none());
        assert!(config.encryption_key.is_none());
        assert!(config.detached);
    }

    #[test]
    fn from_value_reads_full_surface() {
        let sink = MemorySink::new();
        let raw = json!({
            "enabled": true,
            "log": true,
            "keys": ["a", "c"],
            "encryptionKey": "secret",
            "detached": false,
        });

        let config = PersistConfig::from_value(&id(), &raw, &sink);
        assert!(config.enabled);
        assert!(config.log);
        assert_eq!(config.keys.as_deref(), Some(["a".to_string(), "c".to_string()].as_slice()));
        assert_eq!(config.encryption_key.as_deref(), Some("secret"));
        assert!(!config.detached);
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn from_value_missing_fields_fall_back() {
        let sink = MemorySink::new();
        let config = PersistConfig::from_value(&id(), &json!({}), &sink);
        assert!(!config.enabled);
        assert!(config.keys.is_none());
        assert!(config.detached);
    }

    #[test]
    fn from_value_non_array_keys_warns_and_disables_filter() {
        let sink = MemorySink::new();
        let raw = json!({ "enabled": true, "keys": "a" });

        let config = PersistConfig::from_value(&id(), &raw, &sink);
        assert!(config.keys.is_none());
        assert_eq!(sink.count_kind("malformed_keys"), 1);
    }

    #[test]
    fn from_value_non_string_entry_discards_whole_filter() {
        let sink = MemorySink::new();
        let raw = json!({ "enabled": true, "keys": ["a", 3] });

        let config = PersistConfig::from_value(&id(), &raw, &sink);
        assert!(config.keys.is_none());
        assert_eq!(sink.count_kind("malformed_keys"), 1);
    }

    #[test]
    fn from_value_ignores_unrecognized_fields() {
        let sink = MemorySink::new();
        let raw = json!({ "enabled": true, "paths": ["a"] });

        let config = PersistConfig::from_value(&id(), &raw, &sink);
        assert!(config.enabled);
        assert!(config.keys.is_none());
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn from_value_non_object_is_default() {
        let sink = MemorySink::new();
        let config = PersistConfig::from_value(&id(), &json!(true), &sink);
        assert!(!config.enabled);
    }

    #[test]
    fn settings_resolve_memory_medium_without_dir() {
        let settings = PersistSettings { storage_dir: None };
        let medium = settings.default_medium();
        assert!(format!("{medium:?}").contains("MemoryMedium"));
    }

    #[test]
    fn settings_resolve_file_medium_with_dir() {
        let settings = PersistSettings {
            storage_dir: Some(PathBuf::from("/tmp/snapshots")),
        };
        let medium = settings.default_medium();
        assert!(format!("{medium:?}").contains("FileMedium"));
    }
}
