//! Durable, batch-capped telemetry queue.
//!
//! Records are appended in order and the whole sequence is mirrored to
//! [`EventStorage`] after every mutation. A flush uploads the oldest records
//! as one batch and removes them only once the backend confirmed (or
//! permanently refused) them, which gives at-least-once delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beacon_domain::{EventQueueConfig, EventRecord, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::{EventStorage, EventUploader, UploadOutcome};

#[derive(Debug, Default)]
struct QueueState {
    records: Vec<EventRecord>,
    paused: bool,
}

/// Clears the in-flight flag when a flush ends, including when the flush
/// future is dropped during the upload.
struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct EventQueue {
    state: Mutex<QueueState>,
    sending: AtomicBool,
    storage: Arc<dyn EventStorage>,
    uploader: Arc<dyn EventUploader>,
    max_batch: usize,
}

impl EventQueue {
    /// An empty queue. It starts paused; call [`start`](Self::start) to let
    /// flushes through.
    pub fn new(
        storage: Arc<dyn EventStorage>,
        uploader: Arc<dyn EventUploader>,
        max_batch: usize,
    ) -> Self {
        Self {
            state: Mutex::new(QueueState { paused: true, ..QueueState::default() }),
            sending: AtomicBool::new(false),
            storage,
            uploader,
            max_batch: max_batch.max(1),
        }
    }

    /// A queue restored from the records left in `storage`, started unless
    /// the settings ask for a paused queue.
    ///
    /// # Errors
    /// Returns the storage error if the mirror exists but cannot be read.
    pub async fn load(
        storage: Arc<dyn EventStorage>,
        uploader: Arc<dyn EventUploader>,
        settings: &EventQueueConfig,
    ) -> Result<Self> {
        let records = storage.load().await?;
        if !records.is_empty() {
            info!(pending = records.len(), "Restored queued events");
        }

        let queue = Self::new(storage, uploader, settings.max_batch);
        {
            let mut state = queue.state.lock().await;
            state.records = records;
            state.paused = settings.start_paused;
        }
        Ok(queue)
    }

    /// Append `record` and persist the full sequence.
    ///
    /// The record stays queued in memory even if persisting fails.
    ///
    /// # Errors
    /// Returns the storage error from the mirror write.
    pub async fn enqueue(&self, record: EventRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        state.records.push(record);
        debug!(pending = state.records.len(), "Event queued");
        self.storage.save(&state.records).await
    }

    pub async fn start(&self) {
        self.state.lock().await.paused = false;
        debug!("Event queue started");
    }

    pub async fn stop(&self) {
        self.state.lock().await.paused = true;
        debug!("Event queue stopped");
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.paused
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.records.is_empty()
    }

    /// Snapshot of the queued records, oldest first.
    pub async fn records(&self) -> Vec<EventRecord> {
        self.state.lock().await.records.clone()
    }

    /// Upload the oldest batch unless the queue is paused, empty, or
    /// already sending.
    ///
    /// The queue lock is released during the upload so producers are never
    /// blocked on the network. Returns whether a flush was started.
    ///
    /// Cancel safe: dropping the future mid-upload leaves the batch queued
    /// and lets the next call flush again.
    #[instrument(skip(self))]
    pub async fn flush_if_due(&self) -> bool {
        let (batch, _sending) = {
            let state = self.state.lock().await;
            if state.paused || state.records.is_empty() {
                return false;
            }
            if self.sending.swap(true, Ordering::AcqRel) {
                return false;
            }
            let guard = SendingGuard(&self.sending);
            let take = state.records.len().min(self.max_batch);
            (state.records[..take].to_vec(), guard)
        };

        debug!(batch_len = batch.len(), "Uploading event batch");
        let outcome = self.uploader.upload(&batch).await;

        let mut state = self.state.lock().await;
        match outcome {
            UploadOutcome::Delivered | UploadOutcome::Rejected => {
                if matches!(outcome, UploadOutcome::Rejected) {
                    warn!(batch_len = batch.len(), "Backend rejected stale events, discarding");
                }
                if state.records.starts_with(&batch) {
                    state.records.drain(..batch.len());
                    if let Err(err) = self.storage.save(&state.records).await {
                        warn!(error = %err, "Failed to persist event queue after upload");
                    }
                    info!(batch_len = batch.len(), pending = state.records.len(), "Event batch settled");
                } else {
                    debug!("Queue was cleared during upload");
                }
            }
            UploadOutcome::Failed(err) => {
                warn!(error = %err, batch_len = batch.len(), "Event upload failed, will retry");
            }
        }
        true
    }

    /// Drop every queued record and remove the mirror.
    ///
    /// # Errors
    /// Returns the storage error from removing the mirror.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.records.clear();
        self.storage.clear().await
    }
}
