//! Structured diagnostics for degraded persistence operations.
//!
//! The adapter never fails its caller: misconfiguration, unknown keys,
//! and restore or save failures all degrade to a [`Diagnostic`] emitted
//! through a [`DiagnosticsSink`]. Consolidating emission behind one seam
//! keeps the read/write pipeline free of logging calls and lets tests
//! assert on emitted diagnostics without capturing log output.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::domain::StoreId;

/// Phase of the persistence pipeline a diagnostic was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Attach-time restore (storage → live state).
    Restore,
    /// Snapshot save (live state → storage).
    Save,
}

/// Non-fatal warning or failure raised by the persistence adapter.
///
/// Every variant carries the store it concerns so a shared sink can be
/// used across many stores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Persistence was attached but `enabled` is false; the adapter is
    /// inert for this store.
    PersistenceDisabled {
        /// Store the configuration belongs to.
        store_id: StoreId,
    },

    /// The `keys` option did not hold a list of field names; the filter
    /// is treated as absent.
    MalformedKeys {
        /// Store the configuration belongs to.
        store_id: StoreId,
    },

    /// A configured key is absent (or null) in the live state; the key
    /// was skipped.
    UnknownKey {
        /// Store the key was looked up in.
        store_id: StoreId,
        /// The configured field name.
        key: String,
        /// Whether the lookup happened during restore or save.
        phase: Phase,
    },

    /// Attach-time restore failed; the live state is unchanged and sync
    /// still begins.
    RestoreFailed {
        /// Store whose snapshot could not be restored.
        store_id: StoreId,
        /// Human-readable failure cause.
        reason: String,
    },

    /// A snapshot write failed; this mutation is not persisted.
    SaveFailed {
        /// Store whose snapshot could not be written.
        store_id: StoreId,
        /// Human-readable failure cause.
        reason: String,
    },
}

impl Diagnostic {
    /// Returns the store this diagnostic concerns.
    #[must_use]
    pub fn store_id(&self) -> &StoreId {
        match self {
            Self::PersistenceDisabled { store_id }
            | Self::MalformedKeys { store_id }
            | Self::UnknownKey { store_id, .. }
            | Self::RestoreFailed { store_id, .. }
            | Self::SaveFailed { store_id, .. } => store_id,
        }
    }

    /// Returns the diagnostic kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::PersistenceDisabled { .. } => "persistence_disabled",
            Self::MalformedKeys { .. } => "malformed_keys",
            Self::UnknownKey { .. } => "unknown_key",
            Self::RestoreFailed { .. } => "restore_failed",
            Self::SaveFailed { .. } => "save_failed",
        }
    }
}

/// Receiver for adapter diagnostics.
///
/// Implementations must be cheap and non-blocking: `emit` is called
/// inline from the restore and sync paths.
pub trait DiagnosticsSink: fmt::Debug + Send + Sync {
    /// Delivers one diagnostic event.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Production sink that forwards diagnostics to `tracing`.
///
/// Restore and save failures are logged at `warn`, configuration and
/// unknown-key conditions also at `warn` since they indicate a mismatch
/// between configuration and live state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates a new tracing-backed sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DiagnosticsSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::PersistenceDisabled { store_id } => {
                tracing::warn!(
                    store_id = %store_id,
                    "persistence attached but not enabled; check the store configuration"
                );
            }
            Diagnostic::MalformedKeys { store_id } => {
                tracing::warn!(
                    store_id = %store_id,
                    "persist keys must be a list of field names; filter ignored"
                );
            }
            Diagnostic::UnknownKey {
                store_id,
                key,
                phase,
            } => {
                tracing::warn!(
                    store_id = %store_id,
                    key = %key,
                    phase = ?phase,
                    "persist key not found in live state"
                );
            }
            Diagnostic::RestoreFailed { store_id, reason } => {
                tracing::warn!(
                    store_id = %store_id,
                    reason = %reason,
                    "snapshot restore failed; continuing with in-memory state"
                );
            }
            Diagnostic::SaveFailed { store_id, reason } => {
                tracing::warn!(
                    store_id = %store_id,
                    reason = %reason,
                    "snapshot write failed; state not persisted for this mutation"
                );
            }
        }
    }
}

/// In-memory sink collecting every emitted diagnostic.
///
/// Intended for tests and embedded hosts that surface diagnostics through
/// their own channels.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all diagnostics emitted so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns all diagnostics emitted so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns how many diagnostics of the given kind were emitted.
    #[must_use]
    pub fn count_kind(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.kind_str() == kind)
            .count()
    }
}

impl DiagnosticsSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn id() -> StoreId {
        StoreId::new("cart")
    }

    #[test]
    fn kind_str_matches_variant() {
        let d = Diagnostic::RestoreFailed {
            store_id: id(),
            reason: "bad json".to_string(),
        };
        assert_eq!(d.kind_str(), "restore_failed");
    }

    #[test]
    fn store_id_accessor() {
        let d = Diagnostic::PersistenceDisabled { store_id: id() };
        assert_eq!(d.store_id().as_str(), "cart");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let d = Diagnostic::UnknownKey {
            store_id: id(),
            key: "theme".to_string(),
            phase: Phase::Save,
        };
        let json = serde_json::to_string(&d).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"kind\":\"unknown_key\""));
        assert!(json.contains("\"phase\":\"save\""));
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.emit(Diagnostic::PersistenceDisabled { store_id: id() });
        sink.emit(Diagnostic::MalformedKeys { store_id: id() });

        let events = sink.snapshot();
        let kinds: Vec<_> = events.iter().map(Diagnostic::kind_str).collect();
        assert_eq!(kinds, ["persistence_disabled", "malformed_keys"]);
    }

    #[test]
    fn memory_sink_drain_empties() {
        let sink = MemorySink::new();
        sink.emit(Diagnostic::MalformedKeys { store_id: id() });
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn count_kind_filters() {
        let sink = MemorySink::new();
        sink.emit(Diagnostic::UnknownKey {
            store_id: id(),
            key: "a".to_string(),
            phase: Phase::Restore,
        });
        sink.emit(Diagnostic::UnknownKey {
            store_id: id(),
            key: "b".to_string(),
            phase: Phase::Save,
        });
        sink.emit(Diagnostic::MalformedKeys { store_id: id() });
        assert_eq!(sink.count_kind("unknown_key"), 2);
        assert_eq!(sink.count_kind("restore_failed"), 0);
    }
}
