//! Port interfaces for the event queue and event enrichment

use async_trait::async_trait;
use beacon_domain::{BeaconError, EventRecord, GeoPoint, Result};

/// Durable mirror of the queued records.
#[async_trait]
pub trait EventStorage: Send + Sync {
    /// Replace the stored sequence with `records`.
    async fn save(&self, records: &[EventRecord]) -> Result<()>;

    /// The stored sequence, empty when nothing was saved yet.
    async fn load(&self) -> Result<Vec<EventRecord>>;

    /// Remove the stored sequence.
    async fn clear(&self) -> Result<()>;
}

/// Result of handing one batch to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The backend stored every record of the batch.
    Delivered,
    /// The backend refused the batch as stale. It will never be accepted.
    Rejected,
    /// Nothing is known to have been stored; the batch should be retried.
    Failed(BeaconError),
}

/// Sends a batch of records to the analytics backend.
#[async_trait]
pub trait EventUploader: Send + Sync {
    async fn upload(&self, batch: &[EventRecord]) -> UploadOutcome;
}

/// Static facts about the host device and application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: String,
    pub os_version: String,
    pub application_version: Option<String>,
    pub installation_id: Option<String>,
}

pub trait DeviceInfoProvider: Send + Sync {
    fn device_info(&self) -> DeviceInfo;
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// The last known location, if the host has one.
    async fn current_location(&self) -> Option<GeoPoint>;
}
