//! Persistence layer: storage media, snapshot encryption, and the
//! adapter that ties them to live stores.
//!
//! [`StorageMedium`] is the durable key-value seam, [`SnapshotCipher`]
//! seals serialized snapshots when a store configures an encryption
//! key, and [`PersistenceAdapter`] runs the restore/sync pipeline.

pub mod adapter;
pub mod cipher;
pub mod medium;

pub use adapter::{Attachment, PersistenceAdapter, RestoreOutcome};
pub use cipher::SnapshotCipher;
pub use medium::{FileMedium, MemoryMedium, StorageMedium};
