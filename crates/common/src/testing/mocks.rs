//! Mock implementations of platform services for tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::security::{KeychainError, SecretStore};

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory [`SecretStore`] that never touches the platform keychain.
///
/// Clones share the same storage, which lets a test hand one clone to the
/// code under test and inspect the other.
#[derive(Clone, Debug)]
pub struct MockKeychainProvider {
    storage: StorageData,
    service_name: String,
    fail_writes: Arc<Mutex<bool>>,
}

impl MockKeychainProvider {
    /// Create a new mock keychain provider with a service name for namespacing.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            service_name: service_name.into(),
            fail_writes: Arc::new(Mutex::new(false)),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Determine whether a secret exists.
    #[must_use]
    pub fn secret_exists(&self, key: &str) -> bool {
        self.storage.lock().contains_key(key)
    }

    /// Make subsequent writes and deletes fail with `AccessFailed`.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    fn check_writable(&self, key: &str) -> Result<(), KeychainError> {
        if *self.fail_writes.lock() {
            return Err(KeychainError::AccessFailed(format!("write to {key} rejected by mock")));
        }
        Ok(())
    }
}

impl Default for MockKeychainProvider {
    fn default() -> Self {
        Self::new("beacon-test")
    }
}

impl SecretStore for MockKeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.check_writable(key)?;
        self.storage.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        self.storage.lock().get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.check_writable(key)?;
        self.storage.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_delete_secret() {
        let keychain = MockKeychainProvider::default();

        keychain.set_secret("credential.application", "{}").unwrap();
        assert!(keychain.secret_exists("credential.application"));
        assert_eq!(keychain.get_secret("credential.application").unwrap(), "{}");

        keychain.delete_secret("credential.application").unwrap();
        assert!(!keychain.secret_exists("credential.application"));
        assert!(matches!(
            keychain.get_secret("credential.application"),
            Err(KeychainError::NotFound)
        ));
    }

    #[test]
    fn test_clones_share_storage() {
        let keychain = MockKeychainProvider::default();
        let observer = keychain.clone();

        keychain.set_secret("k", "v").unwrap();
        assert_eq!(observer.get_secret("k").unwrap(), "v");
    }

    #[test]
    fn test_failing_writes() {
        let keychain = MockKeychainProvider::default();
        keychain.set_fail_writes(true);
        assert!(matches!(keychain.set_secret("k", "v"), Err(KeychainError::AccessFailed(_))));
        assert!(!keychain.secret_exists("k"));
    }
}
