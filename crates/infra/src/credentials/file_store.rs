//! File-backed credential storage for hosts without a usable keychain.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use beacon_common::storage::JsonFileStore;
use beacon_core::CredentialStore;
use beacon_domain::{BeaconError, Credential, IdentityKind, Result};
use tracing::instrument;

use crate::errors::InfraError;

/// One `<kind>.json` document per identity under a directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document(&self, kind: IdentityKind) -> JsonFileStore {
        JsonFileStore::new(self.dir.join(format!("{kind}.json")))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self), fields(identity = %kind))]
    async fn load(&self, kind: IdentityKind) -> Result<Option<Credential>> {
        let loaded: Option<Credential> =
            self.document(kind).load().await.map_err(InfraError::from)?;
        match loaded {
            Some(credential) if credential.kind != kind => Err(BeaconError::Storage(format!(
                "{kind}.json holds a {} credential",
                credential.kind
            ))),
            other => Ok(other),
        }
    }

    #[instrument(skip(self, credential), fields(identity = %credential.kind))]
    async fn store(&self, credential: &Credential) -> Result<()> {
        self.document(credential.kind).save(credential).await.map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self), fields(identity = %kind))]
    async fn reset(&self, kind: IdentityKind) -> Result<()> {
        self.document(kind).remove().await.map_err(InfraError::from)?;
        Ok(())
    }
}
