//! JSON file mirror of the event queue.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use beacon_common::storage::JsonFileStore;
use beacon_core::EventStorage;
use beacon_domain::{EventQueueConfig, EventRecord, Result};
use tracing::{debug, instrument};

use crate::errors::InfraError;

/// Keeps the queued records as one JSON array, rewritten atomically on
/// every save.
#[derive(Debug, Clone)]
pub struct FileEventStorage {
    file: JsonFileStore,
}

impl FileEventStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { file: JsonFileStore::new(path) }
    }

    /// Storage at `cache_dir/<events.file_name>`.
    pub fn in_dir(cache_dir: &Path, settings: &EventQueueConfig) -> Self {
        Self::new(cache_dir.join(&settings.file_name))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait]
impl EventStorage for FileEventStorage {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn save(&self, records: &[EventRecord]) -> Result<()> {
        self.file.save(records).await.map_err(InfraError::from)?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<EventRecord>> {
        let records: Option<Vec<EventRecord>> =
            self.file.load().await.map_err(InfraError::from)?;
        let records = records.unwrap_or_default();
        debug!(count = records.len(), path = %self.path().display(), "Loaded event mirror");
        Ok(records)
    }

    async fn clear(&self) -> Result<()> {
        self.file.remove().await.map_err(InfraError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use beacon_domain::{BeaconError, Event};
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn missing_file_is_an_empty_queue() {
        let temp = TempDir::new().unwrap();
        let storage = FileEventStorage::in_dir(temp.path(), &EventQueueConfig::default());

        assert_eq!(storage.path(), temp.path().join("Events.json"));
        assert!(storage.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_the_whole_sequence() {
        let temp = TempDir::new().unwrap();
        let storage = FileEventStorage::new(temp.path().join("queue/Events.json"));
        let first = Event::new("Open").into_record();
        let second = Event::new("Close").into_record();

        storage.save(&[first.clone(), second.clone()]).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), vec![first, second.clone()]);

        storage.save(&[second.clone()]).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), vec![second]);

        storage.clear().await.unwrap();
        assert!(!storage.path().exists());
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_mirror_is_a_storage_error() {
        let temp = TempDir::new().unwrap();
        let storage = FileEventStorage::new(temp.path().join("Events.json"));
        std::fs::write(storage.path(), "[{").unwrap();

        assert!(matches!(storage.load().await, Err(BeaconError::Storage(_))));
    }
}
