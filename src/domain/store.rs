//! Live state container.
//!
//! [`Store`] is the in-memory, mutable state a persistence adapter
//! mirrors: a named mapping from field name to arbitrary JSON value.
//! Every mutation goes through [`Store::set`] or [`Store::patch`], so
//! each logical mutation publishes exactly one [`StoreEvent`] through
//! the store's [`ChangeBus`] — including replacements of nested values,
//! which arrive as a new value for their top-level field.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde_json::{Map, Value};

use super::change_bus::{ChangeBus, SubscribeOptions, Subscription};
use super::store_event::{MutationKind, StoreEvent};
use super::store_id::StoreId;

/// Named, live, mutable state container.
///
/// State access is serialized by an internal lock; change notifications
/// are delivered inline after the mutation is applied, in the order the
/// mutations were raised.
#[derive(Debug)]
pub struct Store {
    id: StoreId,
    state: Mutex<Map<String, Value>>,
    bus: ChangeBus,
}

impl Store {
    /// Creates an empty store with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<StoreId>) -> Self {
        Self::with_state(id, Map::new())
    }

    /// Creates a store pre-populated with the given state.
    #[must_use]
    pub fn with_state(id: impl Into<StoreId>, initial: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(initial),
            bus: ChangeBus::new(),
        }
    }

    /// Returns the store identifier.
    #[must_use]
    pub fn id(&self) -> &StoreId {
        &self.id
    }

    /// Returns a snapshot clone of the current state.
    #[must_use]
    pub fn state(&self) -> Map<String, Value> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a clone of one field's current value, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns `true` if the field is present with a non-null value.
    ///
    /// This is the lookup the restore and save paths use: a field that
    /// is absent or explicitly `null` does not count as live.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|value| !value.is_null())
    }

    /// Returns the number of fields in the state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the state holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes one field and publishes a [`MutationKind::FieldSet`] event.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let state = {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            guard.insert(key.clone(), value);
            guard.clone()
        };
        self.notify(MutationKind::FieldSet { key }, state);
    }

    /// Shallow-merges a partial mapping into the state and publishes a
    /// [`MutationKind::Patched`] event.
    ///
    /// Existing fields named in the patch are overwritten; fields absent
    /// from the patch are untouched. An empty patch still counts as one
    /// logical mutation.
    pub fn patch(&self, partial: Map<String, Value>) {
        let keys: Vec<String> = partial.keys().cloned().collect();
        let state = {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            for (key, value) in partial {
                guard.insert(key, value);
            }
            guard.clone()
        };
        self.notify(MutationKind::Patched { keys }, state);
    }

    /// Registers a change listener.
    ///
    /// The callback fires after every subsequent mutation with the full
    /// post-mutation state. Its lifetime follows
    /// [`SubscribeOptions::detached`].
    pub fn subscribe(
        &self,
        options: SubscribeOptions,
        callback: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(options, callback)
    }

    /// Removes a change listener. Returns `true` if it was registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    /// Tears the container down, releasing every listener that was
    /// registered with `detached: false`. Detached listeners survive and
    /// keep firing on further mutations.
    pub fn teardown(&self) {
        self.bus.release_attached();
    }

    /// Returns the number of registered change listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.bus.receiver_count()
    }

    fn notify(&self, mutation: MutationKind, state: Map<String, Value>) {
        let event = StoreEvent {
            store_id: self.id.clone(),
            mutation,
            state,
            timestamp: Utc::now(),
        };
        let _ = self.bus.publish(&event);
    }
}
