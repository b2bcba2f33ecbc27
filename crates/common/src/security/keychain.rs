//! Keychain provider for secure credential storage
//!
//! A thin wrapper over the platform keychain for storing string secrets
//! under a service name. Each secret lives under its own account key, so
//! a write replaces the whole value at once.
//!
//! ## Usage
//!
//! ```no_run
//! use beacon_common::security::{KeychainProvider, SecretStore};
//!
//! let keychain = KeychainProvider::new("beacon.credentials");
//! keychain.set_secret("credential.application", "{}")?;
//! let secret = keychain.get_secret("credential.application")?;
//! assert_eq!(secret, "{}");
//! # Ok::<(), beacon_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Synchronous string secret storage keyed by account name.
pub trait SecretStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backing store rejects the
    /// write.
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// # Errors
    /// Returns `KeychainError::NotFound` if no secret exists under `key`.
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Delete the secret under `key`. Deleting a missing secret succeeds.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backing store rejects the
    /// delete.
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;
}

/// Keychain-backed [`SecretStore`]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Examples
    /// ```
    /// use beacon_common::security::KeychainProvider;
    ///
    /// let keychain = KeychainProvider::new("beacon.credentials");
    /// assert_eq!(keychain.service_name(), "beacon.credentials");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {}", e))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {}: {}", key, e))
        })?;

        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {}: {}", key, e))
            }
        })
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {}: {}",
                key, e
            ))),
        }
    }
}

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,
}

impl ErrorClassification for KeychainError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AccessFailed(_) => ErrorSeverity::Error,
            Self::NotFound => ErrorSeverity::Info,
        }
    }
}
