//! Type-safe store identifier.
//!
//! [`StoreId`] is a newtype wrapper around [`String`] naming one state
//! container. The same value doubles as the key under which the store's
//! snapshot lives in the storage medium.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique name of a state container.
///
/// Chosen by the host at store-definition time and immutable thereafter.
/// Used as the storage key for the persisted snapshot, the discriminator
/// on [`super::StoreEvent`]s, and the subject of every diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

impl StoreId {
    /// Creates a `StoreId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StoreId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StoreId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<StoreId> for String {
    fn from(id: StoreId) -> Self {
        id.0
    }
}

impl AsRef<str> for StoreId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_name() {
        let id = StoreId::new("settings");
        assert_eq!(format!("{id}"), "settings");
    }

    #[test]
    fn serde_is_transparent() {
        let id = StoreId::new("cart");
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"cart\"");

        let back: StoreId = serde_json::from_str(&json).ok().unwrap_or_else(|| {
            panic!("deserialization failed");
        });
        assert_eq!(back, id);
    }

    #[test]
    fn from_conversions_round_trip() {
        let id = StoreId::from("profile");
        assert_eq!(id.as_str(), "profile");
        let raw: String = id.into();
        assert_eq!(raw, "profile");
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = StoreId::new("session");
        let mut map = HashMap::new();
        map.insert(id.clone(), 1);
        assert_eq!(map.get(&id), Some(&1));
    }
}
