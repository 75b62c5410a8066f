//! Database key management using the system keyring

use duesync_domain::{DatabaseConfig, DueSyncError, Result};
use keyring::Entry;
use rand::RngCore;
use tracing::{info, warn};

use crate::errors::InfraError;

const SERVICE_NAME: &str = "com.duesync.app";
const KEY_NAME: &str = "database_encryption_key";
const KEY_BYTES: usize = 32;

/// Manages the SQLCipher key stored in the OS keychain
#[derive(Debug, Clone)]
pub struct KeyManager {
    service: String,
    account: String,
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new(SERVICE_NAME, KEY_NAME)
    }
}

impl KeyManager {
    /// Key manager for a specific keychain service/account pair.
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self { service: service.into(), account: account.into() }
    }

    /// Database key from config, falling back to the keychain.
    pub fn resolve_database_key(&self, database: &DatabaseConfig) -> Result<String> {
        match database.encryption_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => self.get_or_create_key(),
        }
    }

    /// Read the key from the keychain, generating and storing one on first use.
    pub fn get_or_create_key(&self) -> Result<String> {
        let entry = self.entry()?;

        match entry.get_password() {
            Ok(key) => Ok(key),
            Err(keyring::Error::NoEntry) => {
                let key = Self::generate_key();
                entry.set_password(&key).map_err(|e| DueSyncError::from(InfraError::from(e)))?;
                info!(service = %self.service, "generated new database key");
                Ok(key)
            }
            Err(err) => {
                warn!(service = %self.service, error = %err, "keychain read failed");
                Err(InfraError::from(err).into())
            }
        }
    }

    /// Delete the stored key. The database becomes unreadable without it.
    pub fn delete_key(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    /// Random 256-bit key, hex encoded.
    pub fn generate_key() -> String {
        let mut bytes = [0_u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account).map_err(|e| InfraError::from(e).into())
    }
}
