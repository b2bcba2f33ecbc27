//! Keychain-backed credential storage
//!
//! Each identity's record is serialized to JSON and kept as one keychain
//! secret under `credential.<kind>`. Keychain calls block, so they run on
//! the blocking thread pool.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_common::security::{KeychainError, SecretStore};
use beacon_core::CredentialStore;
use beacon_domain::{BeaconError, Credential, IdentityKind, Result};
use tracing::{debug, instrument};

use crate::errors::{InfraError, InfraResult};

pub struct KeychainCredentialStore<S> {
    secrets: Arc<S>,
}

impl<S: SecretStore + 'static> KeychainCredentialStore<S> {
    pub fn new(secrets: Arc<S>) -> Self {
        Self { secrets }
    }

    /// Account key of the secret holding `kind`'s record.
    pub fn key(kind: IdentityKind) -> String {
        format!("credential.{kind}")
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> InfraResult<T> + Send + 'static,
    {
        let secrets = Arc::clone(&self.secrets);
        tokio::task::spawn_blocking(move || op(secrets.as_ref()))
            .await
            .map_err(|e| BeaconError::Internal(format!("keychain task failed: {e}")))?
            .map_err(BeaconError::from)
    }
}

#[async_trait]
impl<S: SecretStore + 'static> CredentialStore for KeychainCredentialStore<S> {
    #[instrument(skip(self), fields(identity = %kind))]
    async fn load(&self, kind: IdentityKind) -> Result<Option<Credential>> {
        let key = Self::key(kind);
        self.blocking(move |secrets| match secrets.get_secret(&key) {
            Ok(json) => {
                let credential: Credential = serde_json::from_str(&json)?;
                if credential.kind != kind {
                    return Err(InfraError(BeaconError::Storage(format!(
                        "keychain entry {key} holds a {} credential",
                        credential.kind
                    ))));
                }
                Ok(Some(credential))
            }
            Err(KeychainError::NotFound) => {
                debug!("No stored credential");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        })
        .await
    }

    #[instrument(skip(self, credential), fields(identity = %credential.kind))]
    async fn store(&self, credential: &Credential) -> Result<()> {
        let key = Self::key(credential.kind);
        let json = serde_json::to_string(credential).map_err(InfraError::from)?;
        self.blocking(move |secrets| Ok(secrets.set_secret(&key, &json)?)).await
    }

    #[instrument(skip(self), fields(identity = %kind))]
    async fn reset(&self, kind: IdentityKind) -> Result<()> {
        let key = Self::key(kind);
        self.blocking(move |secrets| Ok(secrets.delete_secret(&key)?)).await
    }
}
