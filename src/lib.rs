//! # store-mirror
//!
//! Persistence adapter that mirrors in-memory state stores to a durable
//! key-value medium and restores them on startup.
//!
//! A [`domain::Store`] is a named mapping from field name to arbitrary
//! JSON value. Attaching a [`persistence::PersistenceAdapter`] restores
//! any previously stored snapshot into the live state, then keeps the
//! medium synchronized on every subsequent mutation — optionally limited
//! to a subset of fields, optionally encrypted. Every failure is
//! fail-open: persistence degrades to a structured diagnostic while the
//! host keeps running on in-memory state.
//!
//! ## Architecture
//!
//! ```text
//! Host application
//!     │
//!     ├── Store (domain/)            live state + mutations
//!     ├── ChangeBus (domain/)        one event per mutation
//!     │
//!     ├── PersistenceAdapter (persistence/)
//!     │       restore: read → decrypt → deserialize → merge
//!     │       sync:    change → filter → serialize → encrypt → write
//!     │
//!     ├── SnapshotCipher (persistence/)
//!     └── StorageMedium (persistence/)   memory / file / host-supplied
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use store_mirror::config::PersistConfig;
//! use store_mirror::diagnostics::TracingSink;
//! use store_mirror::domain::Store;
//! use store_mirror::persistence::{MemoryMedium, PersistenceAdapter};
//!
//! let adapter = PersistenceAdapter::new(
//!     Arc::new(MemoryMedium::new()),
//!     Arc::new(TracingSink::new()),
//! );
//!
//! let store = Store::new("settings");
//! store.set("theme", json!("dark"));
//!
//! let attachment = adapter.attach(&store, &PersistConfig::enabled());
//! assert!(attachment.is_some());
//!
//! // Every further mutation is written through to the medium.
//! store.set("theme", json!("light"));
//! ```

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod persistence;
