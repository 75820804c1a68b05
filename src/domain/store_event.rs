//! Change notifications emitted on every store mutation.
//!
//! Every mutation publishes one [`StoreEvent`] through the store's
//! [`super::ChangeBus`]. The event carries the full post-mutation state
//! so subscribers (most notably the persistence sync listener) never
//! need to reach back into the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::StoreId;

/// What kind of mutation produced a change notification.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mutation", rename_all = "snake_case")]
pub enum MutationKind {
    /// A single field was written via [`super::Store::set`].
    FieldSet {
        /// The field that was written.
        key: String,
    },

    /// A partial mapping was merged via [`super::Store::patch`].
    Patched {
        /// The fields the patch touched, in patch order.
        keys: Vec<String>,
    },
}

impl MutationKind {
    /// Returns the mutation kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::FieldSet { .. } => "field_set",
            Self::Patched { .. } => "patched",
        }
    }
}

/// Notification of one logical state mutation.
#[derive(Debug, Clone, Serialize)]
pub struct StoreEvent {
    /// Store that was mutated.
    pub store_id: StoreId,
    /// The mutation that raised this event.
    #[serde(flatten)]
    pub mutation: MutationKind,
    /// Full state of the store after the mutation was applied.
    pub state: Map<String, Value>,
    /// When the mutation was applied.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_str_matches_variant() {
        let set = MutationKind::FieldSet {
            key: "theme".to_string(),
        };
        assert_eq!(set.kind_str(), "field_set");

        let patched = MutationKind::Patched { keys: vec![] };
        assert_eq!(patched.kind_str(), "patched");
    }

    #[test]
    fn event_serializes_with_mutation_tag() {
        let mut state = Map::new();
        state.insert("theme".to_string(), json!("dark"));

        let event = StoreEvent {
            store_id: StoreId::new("settings"),
            mutation: MutationKind::FieldSet {
                key: "theme".to_string(),
            },
            state,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"mutation\":\"field_set\""));
        assert!(json.contains("\"store_id\":\"settings\""));
        assert!(json.contains("\"dark\""));
    }
}
