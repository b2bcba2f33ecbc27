//! Credential persistence adapters
//!
//! Both stores keep one JSON record per identity kind and replace it whole
//! on every write.

pub mod file_store;
pub mod keychain_store;

pub use file_store::FileCredentialStore;
pub use keychain_store::KeychainCredentialStore;

use std::sync::Arc;

use beacon_common::security::KeychainProvider;
use beacon_core::CredentialStore;
use beacon_domain::{CredentialBackend, StorageConfig};

/// The credential store selected by `storage.credential_backend`.
pub fn store_for(config: &StorageConfig) -> Arc<dyn CredentialStore> {
    match config.credential_backend {
        CredentialBackend::Keychain => Arc::new(KeychainCredentialStore::new(Arc::new(
            KeychainProvider::new(config.keychain_service.clone()),
        ))),
        CredentialBackend::File => {
            Arc::new(FileCredentialStore::new(config.cache_dir.join("credentials")))
        }
    }
}
