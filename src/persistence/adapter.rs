//! Persistence adapter: attach-time restore and mutation-driven sync.
//!
//! [`PersistenceAdapter::attach`] wires one [`Store`] to a storage
//! medium. The pipeline is linear in both directions:
//!
//! ```text
//! restore:  read → decrypt → deserialize → merge
//! sync:     change → filter → serialize → encrypt → write
//! ```
//!
//! Every failure is fail-open: it degrades to a
//! [`Diagnostic`] and the host application keeps running on in-memory
//! state. Nothing in this module returns an error to the caller.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::PersistConfig;
use crate::diagnostics::{Diagnostic, DiagnosticsSink, Phase, TracingSink};
use crate::domain::{Store, StoreId, SubscribeOptions, Subscription};
use crate::error::PersistError;

use super::cipher::SnapshotCipher;
use super::medium::StorageMedium;

/// How the attach-time restore concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A stored snapshot was found and merged into the live state.
    Restored,
    /// Nothing was stored yet; the current state was written as the
    /// baseline snapshot.
    BaselineWritten,
    /// The stored snapshot could not be read, decrypted, or parsed; the
    /// live state is unchanged. Sync still runs.
    Failed,
}

/// Result of a successful [`PersistenceAdapter::attach`].
///
/// Holding the [`Subscription`] is the syncing state: it stays active
/// for the lifetime of the process, or until the store is torn down and
/// the configuration was not detached.
#[derive(Debug, Clone, Copy)]
pub struct Attachment {
    /// How the restore phase concluded.
    pub outcome: RestoreOutcome,
    /// Handle for the registered sync listener.
    pub subscription: Subscription,
}

/// Mirrors stores to a storage medium and restores them on attach.
///
/// The adapter owns the resolved default medium (used whenever a store's
/// configuration does not override `storage`) and the diagnostics sink
/// every warning and failure is reported through.
#[derive(Debug)]
pub struct PersistenceAdapter {
    default_storage: Arc<dyn StorageMedium>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl PersistenceAdapter {
    /// Creates an adapter with an explicit default medium and sink.
    #[must_use]
    pub fn new(default_storage: Arc<dyn StorageMedium>, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            default_storage,
            sink,
        }
    }

    /// Creates an adapter with environment-resolved defaults: the medium
    /// from [`crate::config::PersistSettings::from_env`] and a
    /// [`TracingSink`].
    #[must_use]
    pub fn from_env() -> Self {
        let settings = crate::config::PersistSettings::from_env();
        Self::new(settings.default_medium(), Arc::new(TracingSink::new()))
    }

    /// Attaches persistence to a store.
    ///
    /// With `enabled: false` this emits a
    /// [`Diagnostic::PersistenceDisabled`] warning and returns `None`
    /// without touching storage. Otherwise it restores any previously
    /// stored snapshot (or writes the baseline when storage is empty),
    /// registers the sync listener, and returns the [`Attachment`].
    /// Restore failures do not block the sync listener.
    pub fn attach(&self, store: &Store, config: &PersistConfig) -> Option<Attachment> {
        if !config.enabled {
            self.sink.emit(Diagnostic::PersistenceDisabled {
                store_id: store.id().clone(),
            });
            return None;
        }

        let medium = config
            .storage
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.default_storage));
        let cipher = config.encryption_key.as_deref().map(SnapshotCipher::new);

        let outcome = match medium.get(store.id().as_str()) {
            Ok(Some(raw)) => {
                match restore_into(
                    store,
                    &raw,
                    cipher.as_ref(),
                    config.keys.as_deref(),
                    self.sink.as_ref(),
                ) {
                    Ok(()) => RestoreOutcome::Restored,
                    Err(err) => {
                        self.sink.emit(Diagnostic::RestoreFailed {
                            store_id: store.id().clone(),
                            reason: err.to_string(),
                        });
                        RestoreOutcome::Failed
                    }
                }
            }
            Ok(None) => {
                // Nothing stored yet: establish the baseline snapshot.
                persist_snapshot(
                    store.id(),
                    &store.state(),
                    config.keys.as_deref(),
                    cipher.as_ref(),
                    medium.as_ref(),
                    self.sink.as_ref(),
                );
                RestoreOutcome::BaselineWritten
            }
            Err(err) => {
                self.sink.emit(Diagnostic::RestoreFailed {
                    store_id: store.id().clone(),
                    reason: err.to_string(),
                });
                RestoreOutcome::Failed
            }
        };

        let store_id = store.id().clone();
        let keys = config.keys.clone();
        let log = config.log;
        let sync_medium = Arc::clone(&medium);
        let sync_sink = Arc::clone(&self.sink);
        let subscription = store.subscribe(
            SubscribeOptions {
                detached: config.detached,
            },
            move |event| {
                if log {
                    tracing::debug!(
                        store_id = %event.store_id,
                        mutation = event.mutation.kind_str(),
                        "state mutated; writing snapshot"
                    );
                }
                persist_snapshot(
                    &store_id,
                    &event.state,
                    keys.as_deref(),
                    cipher.as_ref(),
                    sync_medium.as_ref(),
                    sync_sink.as_ref(),
                );
            },
        );

        tracing::debug!(store_id = %store.id(), outcome = ?outcome, "persistence attached");
        Some(Attachment {
            outcome,
            subscription,
        })
    }
}

/// Merges a stored snapshot into the live state.
///
/// Without a `keys` filter the whole mapping is applied as one patch.
/// With a filter, each listed key overwrites the live field only when
/// the live state already holds it; unknown keys are discarded with a
/// warning, never added.
fn restore_into(
    store: &Store,
    raw: &str,
    cipher: Option<&SnapshotCipher>,
    keys: Option<&[String]>,
    sink: &dyn DiagnosticsSink,
) -> Result<(), PersistError> {
    let text: Cow<'_, str> = match cipher {
        Some(cipher) => Cow::Owned(cipher.decrypt(raw)?),
        None => Cow::Borrowed(raw),
    };

    let value: Value =
        serde_json::from_str(&text).map_err(|err| PersistError::Malformed(err.to_string()))?;
    let Value::Object(snapshot) = value else {
        return Err(PersistError::NotAMapping);
    };

    match keys {
        None => store.patch(snapshot),
        Some(keys) => {
            for key in keys {
                if store.contains(key) {
                    if let Some(value) = snapshot.get(key) {
                        store.set(key.clone(), value.clone());
                    }
                } else {
                    sink.emit(Diagnostic::UnknownKey {
                        store_id: store.id().clone(),
                        key: key.clone(),
                        phase: Phase::Restore,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Serializes the (optionally filtered) state and writes it to storage.
///
/// Fields named in `keys` but absent or null in the state are skipped
/// with a warning. Serialize, encrypt, and write failures emit
/// [`Diagnostic::SaveFailed`] and drop this write.
fn persist_snapshot(
    store_id: &StoreId,
    state: &Map<String, Value>,
    keys: Option<&[String]>,
    cipher: Option<&SnapshotCipher>,
    medium: &dyn StorageMedium,
    sink: &dyn DiagnosticsSink,
) {
    let snapshot = match keys {
        None => state.clone(),
        Some(keys) => {
            let mut filtered = Map::new();
            for key in keys {
                match state.get(key) {
                    Some(value) if !value.is_null() => {
                        filtered.insert(key.clone(), value.clone());
                    }
                    _ => sink.emit(Diagnostic::UnknownKey {
                        store_id: store_id.clone(),
                        key: key.clone(),
                        phase: Phase::Save,
                    }),
                }
            }
            filtered
        }
    };

    let written = serde_json::to_string(&snapshot)
        .map_err(|err| PersistError::Serialize(err.to_string()))
        .and_then(|text| match cipher {
            Some(cipher) => cipher.encrypt(&text),
            None => Ok(text),
        })
        .and_then(|payload| medium.set(store_id.as_str(), &payload));

    if let Err(err) = written {
        sink.emit(Diagnostic::SaveFailed {
            store_id: store_id.clone(),
            reason: err.to_string(),
        });
    }
}
