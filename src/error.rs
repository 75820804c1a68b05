//! Persistence error types.
//!
//! [`PersistError`] is the central error type for the crate. It only
//! travels between internal seams (storage media, the snapshot cipher,
//! serialization): the adapter itself is fail-open and converts every
//! failure into a [`crate::diagnostics::Diagnostic`] instead of
//! propagating it to the caller.

/// Error raised by a storage medium, the snapshot cipher, or snapshot
/// (de)serialization.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The storage medium failed to read or write a value.
    #[error("storage error: {0}")]
    Storage(String),

    /// Snapshot encryption failed.
    #[error("encryption error: {0}")]
    Encrypt(String),

    /// Snapshot decryption failed (bad envelope, wrong key, or
    /// non-UTF-8 plaintext).
    #[error("decryption error: {0}")]
    Decrypt(String),

    /// The stored payload is not valid JSON.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    /// The stored payload parsed, but is not a JSON object. Persisted
    /// snapshots must deserialize to a field-name → value mapping.
    #[error("snapshot is not a mapping")]
    NotAMapping,

    /// The snapshot could not be serialized to JSON text.
    #[error("serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = PersistError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn not_a_mapping_is_self_describing() {
        let err = PersistError::NotAMapping;
        assert_eq!(err.to_string(), "snapshot is not a mapping");
    }
}
