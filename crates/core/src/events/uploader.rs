//! [`EventUploader`] backed by the analytics module.

use async_trait::async_trait;
use beacon_domain::{BeaconError, EventRecord, Module, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ports::{EventUploader, UploadOutcome};
use crate::dispatch::{RequestDescriptor, RequestDispatcher, ResponseBody};

/// Error code the backend answers with when a batch is too old to accept.
const STALE_EVENTS_ERROR: &str = "invalid_request";

#[derive(Deserialize)]
struct DataEnvelope {
    #[serde(rename = "Data")]
    data: Vec<Value>,
}

/// Uploads batches as the preferred user identity.
#[derive(Clone)]
pub struct AnalyticsUploader {
    dispatcher: RequestDispatcher,
}

impl AnalyticsUploader {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    async fn send(&self, batch: &[EventRecord]) -> Result<usize> {
        let path = format!("projects/{}/events", self.dispatcher.config().project_id);
        let body = serde_json::to_value(batch).map_err(|e| BeaconError::Parse(e.to_string()))?;
        let descriptor = RequestDescriptor::post(Module::Analytics, path).with_json(body);
        let kind = self.dispatcher.vault().preferred_user_identity();

        let expected = batch.len();
        let parser = move |body: &ResponseBody| -> Result<usize> {
            let envelope: DataEnvelope = body.json()?;
            if envelope.data.len() == expected {
                Ok(expected)
            } else {
                Err(BeaconError::Parse(format!(
                    "backend acknowledged {} of {expected} events",
                    envelope.data.len()
                )))
            }
        };
        self.dispatcher.submit_with(kind, descriptor, parser).await
    }
}

#[async_trait]
impl EventUploader for AnalyticsUploader {
    async fn upload(&self, batch: &[EventRecord]) -> UploadOutcome {
        match self.send(batch).await {
            Ok(count) => {
                debug!(count, "Events delivered");
                UploadOutcome::Delivered
            }
            Err(BeaconError::UnhandledHttp { status: 400, error_code: Some(code) })
                if code == STALE_EVENTS_ERROR =>
            {
                warn!(count = batch.len(), error = %BeaconError::EventsRejected, "Discarding batch");
                UploadOutcome::Rejected
            }
            Err(err) => UploadOutcome::Failed(err),
        }
    }
}
