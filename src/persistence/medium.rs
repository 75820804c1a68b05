//! Storage medium capability and built-in implementations.
//!
//! [`StorageMedium`] is the key-value seam the adapter writes snapshots
//! through: synchronous `get`/`set` over string values, keyed by store
//! identifier. Two implementations ship with the crate:
//!
//! - [`MemoryMedium`] — process-local map, the default medium and the
//!   one tests run against.
//! - [`FileMedium`] — one snapshot file per store under a root
//!   directory, for hosts that want durability across restarts.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::PersistError;

/// Synchronous key-value storage capability.
///
/// Implementations must treat values as opaque text: the adapter may
/// hand them plain JSON or an encrypted envelope.
pub trait StorageMedium: fmt::Debug + Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Storage`] when the medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Storage`] when the medium cannot be
    /// written.
    fn set(&self, key: &str, value: &str) -> Result<(), PersistError>;
}

/// Process-local in-memory medium.
///
/// Contents live for the lifetime of the value; useful as the explicit
/// default medium, in tests, and for hosts that only want the restore
/// and sync mechanics without durability.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    cells: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    /// Creates an empty medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageMedium for MemoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self
            .cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed medium storing one snapshot file per store id.
///
/// Snapshots live at `<root>/<store-id>.snapshot`. Writes go to a
/// temporary file first and are renamed into place, so a crash mid-write
/// leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    /// Creates a medium rooted at the given directory.
    ///
    /// The directory is created on first write, not here.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory snapshots are stored under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a store id to its snapshot path, rejecting ids that would
    /// escape the root directory.
    fn snapshot_path(&self, key: &str) -> Result<PathBuf, PersistError> {
        if key.is_empty()
            || key.contains(['/', '\\'])
            || key == "."
            || key == ".."
            || key.contains("..")
        {
            return Err(PersistError::Storage(format!(
                "store id {key:?} is not a valid snapshot file name"
            )));
        }
        Ok(self.root.join(format!("{key}.snapshot")))
    }
}

impl StorageMedium for FileMedium {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.snapshot_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PersistError::Storage(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let path = self.snapshot_path(key)?;
        std::fs::create_dir_all(&self.root).map_err(|err| {
            PersistError::Storage(format!(
                "failed to create {}: {err}",
                self.root.display()
            ))
        })?;

        // Write-then-rename keeps the previous snapshot readable if the
        // process dies mid-write.
        let tmp = path.with_extension("snapshot.tmp");
        std::fs::write(&tmp, value).map_err(|err| {
            PersistError::Storage(format!("failed to write {}: {err}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &path).map_err(|err| {
            PersistError::Storage(format!("failed to replace {}: {err}", path.display()))
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip() {
        let medium = MemoryMedium::new();
        assert_eq!(medium.get("cart").ok(), Some(None));

        assert!(medium.set("cart", "{\"items\":[]}").is_ok());
        assert_eq!(
            medium.get("cart").ok().flatten().as_deref(),
            Some("{\"items\":[]}")
        );
        assert_eq!(medium.len(), 1);
    }

    #[test]
    fn memory_overwrites() {
        let medium = MemoryMedium::new();
        let _ = medium.set("k", "v1");
        let _ = medium.set("k", "v2");
        assert_eq!(medium.get("k").ok().flatten().as_deref(), Some("v2"));
        assert_eq!(medium.len(), 1);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().ok();
        let Some(dir) = dir else {
            panic!("tempdir failed");
        };
        let medium = FileMedium::new(dir.path());

        assert_eq!(medium.get("settings").ok(), Some(None));
        assert!(medium.set("settings", "{\"theme\":\"dark\"}").is_ok());
        assert_eq!(
            medium.get("settings").ok().flatten().as_deref(),
            Some("{\"theme\":\"dark\"}")
        );
        assert!(dir.path().join("settings.snapshot").exists());
    }

    #[test]
    fn file_overwrite_replaces_contents() {
        let dir = tempfile::tempdir().ok();
        let Some(dir) = dir else {
            panic!("tempdir failed");
        };
        let medium = FileMedium::new(dir.path());

        let _ = medium.set("s", "first");
        let _ = medium.set("s", "second");
        assert_eq!(medium.get("s").ok().flatten().as_deref(), Some("second"));
    }

    #[test]
    fn file_rejects_path_traversal_ids() {
        let dir = tempfile::tempdir().ok();
        let Some(dir) = dir else {
            panic!("tempdir failed");
        };
        let medium = FileMedium::new(dir.path());

        for bad in ["../escape", "a/b", "a\\b", "", ".."] {
            assert!(medium.set(bad, "x").is_err(), "id {bad:?} should be rejected");
            assert!(medium.get(bad).is_err());
        }
    }

    #[test]
    fn file_missing_root_reads_as_absent() {
        let medium = FileMedium::new("/nonexistent-store-mirror-root");
        assert_eq!(medium.get("anything").ok(), Some(None));
    }
}
