//! Mock implementations of core ports for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_domain::{BeaconError, Credential, EventRecord, GeoPoint, IdentityKind, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::auth::ports::CredentialStore;
use crate::events::ports::{
    DeviceInfo, DeviceInfoProvider, EventStorage, EventUploader, LocationProvider, UploadOutcome,
};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};

type Scripted = std::result::Result<HttpResponse, TransportError>;

/// [`HttpTransport`] answering from per-route scripts.
///
/// Routes are keyed by method and URL path (`/v2/token`). Each route plays
/// its queued answers in order and keeps repeating the last one. Requests
/// to unscripted routes get a 404. Every request is logged.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Scripted>>>,
    log: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer, to widen windows in concurrency tests.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    fn push(&self, method: HttpMethod, path: &str, answer: Scripted) {
        self.routes.lock().entry((method, path.to_owned())).or_default().push_back(answer);
    }

    pub fn respond(&self, method: HttpMethod, path: &str, response: HttpResponse) {
        self.push(method, path, Ok(response));
    }

    pub fn respond_json(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.respond(method, path, HttpResponse::json(status, &body));
    }

    pub fn fail(&self, method: HttpMethod, path: &str, error: TransportError) {
        self.push(method, path, Err(error));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().clone()
    }

    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<HttpRequest> {
        self.log.lock().iter().filter(|r| r.method == method && r.path() == path).cloned().collect()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    fn answer(&self, request: &HttpRequest) -> Scripted {
        let mut routes = self.routes.lock();
        match routes.get_mut(&(request.method, request.path().to_owned())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> Scripted {
    Ok(HttpResponse::new(404, Vec::new()))
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        self.log.lock().push(request.clone());
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.answer(&request)
    }
}

/// [`CredentialStore`] backed by a map.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: Mutex<HashMap<IdentityKind, Credential>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
        let store = Self::new();
        store.records.lock().extend(credentials.into_iter().map(|c| (c.kind, c)));
        store
    }

    /// The record as last written for `kind`.
    pub fn stored(&self, kind: IdentityKind) -> Option<Credential> {
        self.records.lock().get(&kind).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BeaconError::Storage("write rejected by mock".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, kind: IdentityKind) -> Result<Option<Credential>> {
        Ok(self.stored(kind))
    }

    async fn store(&self, credential: &Credential) -> Result<()> {
        self.check_writable()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records.lock().insert(credential.kind, credential.clone());
        Ok(())
    }

    async fn reset(&self, kind: IdentityKind) -> Result<()> {
        self.check_writable()?;
        self.records.lock().remove(&kind);
        Ok(())
    }
}

/// [`EventStorage`] backed by a vector.
#[derive(Default)]
pub struct InMemoryEventStorage {
    records: Mutex<Option<Vec<EventRecord>>>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<EventRecord>) -> Self {
        let storage = Self::new();
        *storage.records.lock() = Some(records);
        storage
    }

    /// The persisted sequence, or `None` if it was never saved or was
    /// cleared.
    pub fn persisted(&self) -> Option<Vec<EventRecord>> {
        self.records.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStorage for InMemoryEventStorage {
    async fn save(&self, records: &[EventRecord]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BeaconError::Storage("write rejected by mock".into()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.records.lock() = Some(records.to_vec());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<EventRecord>> {
        Ok(self.records.lock().clone().unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        *self.records.lock() = None;
        Ok(())
    }
}

/// [`EventUploader`] playing queued outcomes, then delivering.
///
/// A gated uploader holds every upload until [`release`](Self::release) is
/// called, which lets a test observe a flush in flight.
#[derive(Default)]
pub struct ScriptedUploader {
    outcomes: Mutex<VecDeque<UploadOutcome>>,
    batches: Mutex<Vec<Vec<EventRecord>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self { gate: Some(Arc::new(Semaphore::new(0))), ..Self::default() }
    }

    pub fn push_outcome(&self, outcome: UploadOutcome) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Let one held upload finish.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Every batch received, in order.
    pub fn batches(&self) -> Vec<Vec<EventRecord>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl EventUploader for ScriptedUploader {
    async fn upload(&self, batch: &[EventRecord]) -> UploadOutcome {
        self.batches.lock().push(batch.to_vec());
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.outcomes.lock().pop_front().unwrap_or(UploadOutcome::Delivered)
    }
}

/// [`DeviceInfoProvider`] returning fixed values.
#[derive(Debug, Clone)]
pub struct StaticDeviceInfo(pub DeviceInfo);

impl Default for StaticDeviceInfo {
    fn default() -> Self {
        Self(DeviceInfo {
            device_type: "TestDevice".into(),
            os_version: "1.0".into(),
            application_version: Some("2.3.4".into()),
            installation_id: None,
        })
    }
}

impl DeviceInfoProvider for StaticDeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        self.0.clone()
    }
}

/// [`LocationProvider`] with a fixed answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<GeoPoint>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<GeoPoint> {
        self.0
    }
}
