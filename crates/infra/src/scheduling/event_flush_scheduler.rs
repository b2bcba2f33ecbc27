//! Periodic flushing of the event queue.
//!
//! Every tick asks the queue to upload its oldest batch. The queue itself
//! decides whether a flush is due (not paused, not empty, nothing in
//! flight), so a slow upload simply makes later ticks no-ops.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use beacon_core::EventQueue;
//! use beacon_infra::scheduling::EventFlushScheduler;
//!
//! # async fn example(queue: Arc<EventQueue>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut scheduler = EventFlushScheduler::new(queue, Duration::from_secs(1));
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use beacon_core::EventQueue;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct EventFlushScheduler {
    queue: Arc<EventQueue>,
    interval: Duration,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl EventFlushScheduler {
    pub fn new(queue: Arc<EventQueue>, interval: Duration) -> Self {
        Self {
            queue,
            interval,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the scheduler
    ///
    /// Spawns a background task that flushes the queue every `interval`.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_ms = self.interval.as_millis() as u64, "Starting event flush scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let queue = Arc::clone(&self.queue);
        let interval = self.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::flush_loop(queue, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion. An upload already
    /// in flight is allowed to settle first.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping event flush scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(STOP_TIMEOUT, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: STOP_TIMEOUT.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Event flush scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn flush_loop(queue: Arc<EventQueue>, interval: Duration, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Flush loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    // Cancellation is only observed between ticks.
                    if queue.flush_if_due().await {
                        debug!("Flush tick uploaded a batch");
                    }
                }
            }
        }
    }
}

impl Drop for EventFlushScheduler {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
