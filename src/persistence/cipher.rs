//! Symmetric snapshot encryption.
//!
//! When a store is configured with an encryption key, the serialized
//! snapshot text is sealed with ChaCha20-Poly1305 before it reaches the
//! storage medium. The stored value is a self-describing envelope:
//!
//! ```text
//! enc:v1:<nonce-base64url>:<ciphertext-base64url>
//! ```
//!
//! The cipher key is derived from the configured passphrase with
//! SHA-256, so any string works as an encryption key. Decryption is
//! authenticated: a wrong passphrase or a tampered envelope fails
//! outright instead of yielding garbage text, and the plaintext is
//! required to be UTF-8 so it can go straight into the JSON parser.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use sha2::{Digest, Sha256};

use crate::error::PersistError;

/// Version prefix identifying an encrypted snapshot envelope.
const ENVELOPE_PREFIX: &str = "enc:v1:";

/// Nonce length for ChaCha20-Poly1305.
const NONCE_LEN: usize = 12;

/// Snapshot cipher bound to one passphrase.
#[derive(Clone)]
pub struct SnapshotCipher {
    key: [u8; 32],
}

impl SnapshotCipher {
    /// Derives a cipher from an arbitrary passphrase string.
    #[must_use]
    pub fn new(passphrase: &str) -> Self {
        let key = Sha256::digest(passphrase.as_bytes()).into();
        Self { key }
    }

    /// Returns `true` if the stored value carries the encrypted
    /// envelope prefix.
    #[must_use]
    pub fn is_envelope(value: &str) -> bool {
        value.starts_with(ENVELOPE_PREFIX)
    }

    /// Seals serialized snapshot text into an envelope string.
    ///
    /// A fresh nonce is drawn for every call, so encrypting the same
    /// snapshot twice produces different envelopes.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encrypt`] if the cipher cannot be
    /// initialized or sealing fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, PersistError> {
        let nonce_source = *uuid::Uuid::new_v4().as_bytes();
        let (nonce_bytes, _) = nonce_source.split_at(NONCE_LEN);
        let nonce_arr: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| PersistError::Encrypt("nonce derivation failed".to_string()))?;
        let nonce = Nonce::from(nonce_arr);

        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|err| PersistError::Encrypt(format!("cipher init failed: {err}")))?;
        let ciphertext = aead
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|err| PersistError::Encrypt(format!("seal failed: {err}")))?;

        Ok(format!(
            "{ENVELOPE_PREFIX}{}:{}",
            URL_SAFE_NO_PAD.encode(nonce_arr),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    /// Opens an envelope string back into snapshot text.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Decrypt`] when the envelope is missing or
    /// malformed, authentication fails (wrong key or tampered data), or
    /// the plaintext is not UTF-8.
    pub fn decrypt(&self, stored: &str) -> Result<String, PersistError> {
        let body = stored.strip_prefix(ENVELOPE_PREFIX).ok_or_else(|| {
            PersistError::Decrypt("stored value is not an encrypted envelope".to_string())
        })?;

        let mut parts = body.split(':');
        let nonce_b64 = parts.next().unwrap_or_default();
        let ciphertext_b64 = parts.next().unwrap_or_default();
        if nonce_b64.is_empty() || ciphertext_b64.is_empty() || parts.next().is_some() {
            return Err(PersistError::Decrypt("envelope is malformed".to_string()));
        }

        let nonce_raw = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|err| PersistError::Decrypt(format!("invalid nonce encoding: {err}")))?;
        let nonce_arr: [u8; NONCE_LEN] = nonce_raw
            .as_slice()
            .try_into()
            .map_err(|_| PersistError::Decrypt("nonce has the wrong length".to_string()))?;
        let nonce = Nonce::from(nonce_arr);

        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext_b64)
            .map_err(|err| PersistError::Decrypt(format!("invalid ciphertext encoding: {err}")))?;

        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|err| PersistError::Decrypt(format!("cipher init failed: {err}")))?;
        let plaintext = aead
            .decrypt(&nonce, ciphertext.as_slice())
            .map_err(|_| PersistError::Decrypt("wrong key or corrupted snapshot".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| PersistError::Decrypt("plaintext is not UTF-8".to_string()))
    }
}

impl fmt::Debug for SnapshotCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("SnapshotCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_restores_plaintext() {
        let cipher = SnapshotCipher::new("k");
        let sealed = cipher.encrypt("{\"a\":1}").ok();
        let Some(sealed) = sealed else {
            panic!("encrypt failed");
        };
        assert!(SnapshotCipher::is_envelope(&sealed));
        assert_eq!(cipher.decrypt(&sealed).ok().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn envelope_has_three_sections() {
        let cipher = SnapshotCipher::new("k");
        let sealed = cipher.encrypt("payload").ok();
        let Some(sealed) = sealed else {
            panic!("encrypt failed");
        };
        let Some(body) = sealed.strip_prefix("enc:v1:") else {
            panic!("missing envelope prefix");
        };
        assert_eq!(body.split(':').count(), 2);
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let cipher = SnapshotCipher::new("k");
        let a = cipher.encrypt("same").ok();
        let b = cipher.encrypt("same").ok();
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = SnapshotCipher::new("right").encrypt("{\"a\":1}").ok();
        let Some(sealed) = sealed else {
            panic!("encrypt failed");
        };
        let result = SnapshotCipher::new("wrong").decrypt(&sealed);
        assert!(matches!(result, Err(PersistError::Decrypt(_))));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = SnapshotCipher::new("k");
        let sealed = cipher.encrypt("{\"a\":1}").ok();
        let Some(mut sealed) = sealed else {
            panic!("encrypt failed");
        };
        // Flip the last character of the ciphertext section.
        let flipped = if sealed.ends_with('A') { 'B' } else { 'A' };
        sealed.pop();
        sealed.push(flipped);
        assert!(cipher.decrypt(&sealed).is_err());
    }

    #[test]
    fn plain_text_is_not_an_envelope() {
        let cipher = SnapshotCipher::new("k");
        assert!(!SnapshotCipher::is_envelope("{\"a\":1}"));
        assert!(matches!(
            cipher.decrypt("{\"a\":1}"),
            Err(PersistError::Decrypt(_))
        ));
    }

    #[test]
    fn same_passphrase_derives_same_key() {
        let sealed = SnapshotCipher::new("shared").encrypt("text").ok();
        let Some(sealed) = sealed else {
            panic!("encrypt failed");
        };
        // A separately-constructed cipher with the same passphrase opens it.
        assert_eq!(
            SnapshotCipher::new("shared").decrypt(&sealed).ok().as_deref(),
            Some("text")
        );
    }
}
