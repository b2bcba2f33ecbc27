use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::storage::error::{StorageError, StorageResult};

/// A single JSON document on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for the document at `path`. Nothing is touched on disk
    /// until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `value` and replace the document with it.
    ///
    /// The bytes are written to a sibling temporary file, synced, then
    /// renamed over the target.
    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> StorageResult<()> {
        let data = serde_json::to_vec(value)?;

        let temp_path = self.path.with_extension("tmp");

        if let Some(parent) = temp_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file =
            fs::OpenOptions::new().write(true).create(true).truncate(true).open(&temp_path).await?;

        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;

        debug!(bytes = data.len(), "Persisted JSON document");

        Ok(())
    }

    /// Read the document, or `None` when the file does not exist.
    ///
    /// # Errors
    /// Returns `StorageError::Corrupt` if the file exists but is not a valid
    /// document of type `T`.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Persistence file does not exist");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data).map(Some).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Delete the document. Removing a missing file succeeds.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn remove(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
