//! AES-256-GCM token cipher
//!
//! Token values are encrypted before they reach SQLite, on top of the
//! SQLCipher page encryption. The key is derived from the database key so a
//! single keychain secret protects both layers.

use duesync_common::EncryptionService;
use duesync_core::TokenCipher;
use duesync_domain::{DueSyncError, Result};

/// [`TokenCipher`] backed by the shared AES-GCM encryption service.
#[derive(Debug)]
pub struct AesTokenCipher {
    service: EncryptionService,
}

impl AesTokenCipher {
    /// Derive the token key from the database secret.
    pub fn from_database_key(database_key: &str) -> Result<Self> {
        let service = EncryptionService::from_secret(database_key)
            .map_err(|e| DueSyncError::Security(format!("token key derivation failed: {e}")))?;
        Ok(Self { service })
    }

    /// Short fingerprint of the derived key, safe to log.
    pub fn key_fingerprint(&self) -> String {
        self.service.key_fingerprint()
    }
}

impl TokenCipher for AesTokenCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.service
            .encrypt_to_string(plaintext.as_bytes())
            .map_err(|e| DueSyncError::Security(format!("token encryption failed: {e}")))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let bytes = self
            .service
            .decrypt_from_string(ciphertext)
            .map_err(|e| DueSyncError::Security(format!("token decryption failed: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|_| DueSyncError::Security("decrypted token is not valid UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB_KEY: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

    #[test]
    fn round_trips_and_hides_plaintext() {
        let cipher = AesTokenCipher::from_database_key(DB_KEY).unwrap();

        let sealed = cipher.encrypt("ya29.access-token").unwrap();
        assert!(!sealed.contains("ya29"));
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "ya29.access-token");
    }

    #[test]
    fn nonces_differ_between_encryptions() {
        let cipher = AesTokenCipher::from_database_key(DB_KEY).unwrap();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn other_database_key_cannot_decrypt() {
        let sealed = AesTokenCipher::from_database_key(DB_KEY).unwrap().encrypt("secret").unwrap();
        let other = AesTokenCipher::from_database_key("another-database-key").unwrap();

        assert!(matches!(other.decrypt(&sealed), Err(DueSyncError::Security(_))));
    }

    #[test]
    fn empty_database_key_is_rejected() {
        assert!(AesTokenCipher::from_database_key("").is_err());
    }
}
