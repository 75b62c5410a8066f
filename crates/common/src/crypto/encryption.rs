//! AES-256-GCM encryption for secrets persisted at rest.
//!
//! - [`EncryptionService`]: AES-256-GCM encryption/decryption
//! - [`EncryptedData`]: serializable encrypted payload container
//!
//! OAuth access and refresh tokens are stored through
//! [`EncryptionService::encrypt_to_string`], which yields a base64 string that
//! fits in a TEXT column.
//!
//! ```rust
//! use duesync_common::crypto::encryption::EncryptionService;
//!
//! let service = EncryptionService::new(EncryptionService::generate_key())?;
//!
//! let encrypted = service.encrypt_to_string(b"ya29.token")?;
//! let decrypted = service.decrypt_from_string(&encrypted)?;
//! assert_eq!(decrypted, b"ya29.token");
//! # Ok::<(), duesync_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CommonError, CommonResult};

const ALGORITHM: &str = "AES-256-GCM";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Encrypted data container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub algorithm: String,
}

/// AES-GCM encryption service.
pub struct EncryptionService {
    key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.key_fingerprint())
            .finish()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::internal(
                "Encryption key must be exactly 32 bytes".to_string(),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| {
            CommonError::internal(format!("Failed to create encryption cipher: {e}"))
        })?;

        Ok(Self { key, cipher })
    }

    /// Derive a 32-byte key from an arbitrary secret string with SHA-256.
    ///
    /// The secret is expected to be high-entropy already (for example the
    /// hex-encoded database key from the OS keychain).
    pub fn from_secret(secret: &str) -> CommonResult<Self> {
        if secret.is_empty() {
            return Err(CommonError::config_field("encryption_key", "secret must not be empty"));
        }

        let mut hasher = Sha256::new();
        hasher.update(b"duesync-token-key:");
        hasher.update(secret.as_bytes());
        Self::new(hasher.finalize().to_vec())
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        Aes256Gcm::generate_key(OsRng).to_vec()
    }

    /// Encrypt bytes into an `EncryptedData` payload.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, data)
            .map_err(|e| CommonError::internal(format!("Encryption failed: {e}")))?;

        Ok(EncryptedData {
            nonce: nonce.to_vec(),
            ciphertext,
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypt an [`EncryptedData`] payload back into raw bytes.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != ALGORITHM {
            return Err(CommonError::internal(format!(
                "Unsupported algorithm: {}",
                encrypted.algorithm
            )));
        }

        if encrypted.nonce.len() != NONCE_LEN {
            return Err(CommonError::internal(
                "Invalid nonce length for AES-256-GCM payload".to_string(),
            ));
        }

        self.cipher
            .decrypt(Nonce::from_slice(&encrypted.nonce), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::internal(format!("Decryption failed: {e}")))
    }

    /// Encrypt bytes and encode the payload as a base64 string.
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    /// Decode a base64 string and decrypt the contained payload.
    pub fn decrypt_from_string(&self, encrypted_str: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encrypted_str)
            .map_err(|e| CommonError::internal(format!("Base64 decode failed: {e}")))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)?;
        self.decrypt(&encrypted)
    }

    /// Generate a short fingerprint for the current key.
    pub fn key_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.key);
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}
