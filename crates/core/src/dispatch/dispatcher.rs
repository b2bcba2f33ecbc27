//! Single execution queue for authenticated calls.
//!
//! Every HTTP exchange and every pipeline run holds one fair async mutex, so
//! credential-mutating work is strictly ordered. Pipelines are spawned tasks
//! kept per identity as shared futures: a caller that needs an identity
//! authenticated either joins the pipeline already in flight or starts one,
//! never both.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use beacon_domain::{BeaconError, DispatcherConfig, IdentityKind, PlatformConfig, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use super::descriptor::{RawBody, RequestDescriptor, ResponseBody, ResponseParser};
use super::operation::{AuthenticatedOperation, ExchangeOutcome, PendingOperation};
use crate::auth::notifications::NotificationHub;
use crate::auth::pipeline::{AuthenticationPipeline, PipelineMode};
use crate::auth::vault::CredentialVault;
use crate::http::HttpTransport;

type PipelineFuture = Shared<BoxFuture<'static, Result<()>>>;

struct Inner {
    config: Arc<PlatformConfig>,
    transport: Arc<dyn HttpTransport>,
    vault: Arc<CredentialVault>,
    pipeline: AuthenticationPipeline,
    notifications: NotificationHub,
    serial: tokio::sync::Mutex<()>,
    in_flight: Mutex<HashMap<IdentityKind, PipelineFuture>>,
    retry_budget: u8,
    reauth_timeout: Option<Duration>,
}

/// Admits authenticated calls and de-duplicates pipelines per identity.
///
/// Cheap to clone; clones share the queue and the in-flight pipelines.
#[derive(Clone)]
pub struct RequestDispatcher {
    inner: Arc<Inner>,
}

impl RequestDispatcher {
    pub fn new(
        config: Arc<PlatformConfig>,
        settings: &DispatcherConfig,
        transport: Arc<dyn HttpTransport>,
        vault: Arc<CredentialVault>,
        notifications: NotificationHub,
    ) -> Self {
        let pipeline = AuthenticationPipeline::new(
            Arc::clone(&config),
            Arc::clone(&transport),
            Arc::clone(&vault),
            notifications.clone(),
        );
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                vault,
                pipeline,
                notifications,
                serial: tokio::sync::Mutex::new(()),
                in_flight: Mutex::new(HashMap::new()),
                retry_budget: settings.retry_budget,
                reauth_timeout: settings.reauth_timeout(),
            }),
        }
    }

    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.inner.vault
    }

    pub fn config(&self) -> &Arc<PlatformConfig> {
        &self.inner.config
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.inner.notifications
    }

    /// Whether a pipeline for `kind` is queued or running.
    pub fn pipeline_in_flight(&self, kind: IdentityKind) -> bool {
        self.inner.in_flight.lock().contains_key(&kind)
    }

    /// Run, or join, a validating pipeline for `kind`.
    ///
    /// # Errors
    /// Returns the pipeline's terminal error.
    #[instrument(skip(self), fields(identity = %kind))]
    pub async fn authenticate(&self, kind: IdentityKind) -> Result<()> {
        self.pipeline(kind, PipelineMode::Full).await
    }

    /// Send `descriptor` as `kind` and return the raw successful body.
    ///
    /// # Errors
    /// See [`submit_with`](Self::submit_with).
    pub async fn submit(
        &self,
        kind: IdentityKind,
        descriptor: RequestDescriptor,
    ) -> Result<ResponseBody> {
        self.submit_with(kind, descriptor, RawBody).await
    }

    /// Send `descriptor` as `kind`, reauthenticating and replaying after a
    /// 401 while the retry budget lasts, and parse the successful body.
    ///
    /// # Errors
    /// - the admission pipeline's error if `kind` could not be authenticated
    /// - `NetworkOffline`, `Forbidden`, `Parse` or `UnhandledHttp` from the
    ///   exchange
    /// - the reauthentication pipeline's error, `ReauthTimeout`, or
    ///   `CouldNotReauthenticate` once the budget is spent
    #[instrument(skip(self, descriptor, parser), fields(identity = %kind, path = %descriptor.path))]
    pub async fn submit_with<T, P>(
        &self,
        kind: IdentityKind,
        descriptor: RequestDescriptor,
        parser: P,
    ) -> Result<T>
    where
        T: Send,
        P: ResponseParser<T>,
    {
        let mut pending = PendingOperation::new(kind, Arc::new(descriptor), self.inner.retry_budget);

        loop {
            self.admit(&pending).await?;

            let mut operation = AuthenticatedOperation::new(pending);
            let outcome = {
                let _serial = self.inner.serial.lock().await;
                let credential = self.inner.vault.get(kind).await?;
                operation
                    .execute(
                        self.inner.transport.as_ref(),
                        &self.inner.config,
                        credential.access_token.as_deref(),
                        &parser,
                    )
                    .await
            };

            match outcome {
                ExchangeOutcome::Succeeded(value) => return Ok(value),
                ExchangeOutcome::Failed(err) => return Err(err),
                ExchangeOutcome::AwaitingReauth => {
                    let settled = self.reauthenticate(kind).await;
                    pending = operation.after_reauth(settled)?;
                }
            }
        }
    }

    /// Make sure `kind` is authenticated before its operation is queued.
    async fn admit(&self, pending: &PendingOperation) -> Result<()> {
        let kind = pending.identity();

        let running = self.inner.in_flight.lock().get(&kind).cloned();
        if let Some(running) = running {
            debug!(identity = %kind, "Waiting on in-flight pipeline");
            return running.await;
        }

        if self.inner.vault.is_authenticated(kind).await? {
            return Ok(());
        }

        debug!(identity = %kind, "Not authenticated, running pipeline first");
        self.pipeline(kind, PipelineMode::Full).await
    }

    /// Wait for a pipeline without validation, bounded by the configured
    /// timeout.
    async fn reauthenticate(&self, kind: IdentityKind) -> Result<()> {
        info!(identity = %kind, "Request unauthorized, reauthenticating");
        let pipeline = self.pipeline(kind, PipelineMode::Reauthenticate);

        match self.inner.reauth_timeout {
            Some(limit) => tokio::time::timeout(limit, pipeline)
                .await
                .unwrap_or(Err(BeaconError::ReauthTimeout(limit))),
            None => pipeline.await,
        }
    }

    /// The in-flight pipeline for `kind`, starting one if there is none.
    fn pipeline(&self, kind: IdentityKind, mode: PipelineMode) -> PipelineFuture {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(existing) = in_flight.get(&kind) {
            return existing.clone();
        }

        debug!(identity = %kind, ?mode, "Starting pipeline");
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = {
                let _serial = inner.serial.lock().await;
                inner.pipeline.run(kind, mode).await
            };
            inner.in_flight.lock().remove(&kind);
            result
        });

        let shared = async move {
            task.await.unwrap_or_else(|e| {
                Err(BeaconError::Internal(format!("authentication task failed: {e}")))
            })
        }
        .boxed()
        .shared();

        in_flight.insert(kind, shared.clone());
        shared
    }
}

#[cfg(test)]
mod tests {
    use beacon_domain::{Credential, Module};
    use serde_json::json;

    use super::*;
    use crate::http::HttpMethod;
    use crate::testing::{test_platform_config, InMemoryCredentialStore, MockTransport};

    fn dispatcher(transport: &Arc<MockTransport>, seed: Vec<Credential>) -> RequestDispatcher {
        let vault =
            Arc::new(CredentialVault::new(Arc::new(InMemoryCredentialStore::with_credentials(seed))));
        RequestDispatcher::new(
            Arc::new(test_platform_config()),
            &DispatcherConfig::default(),
            transport.clone(),
            vault,
            NotificationHub::default(),
        )
    }

    #[tokio::test]
    async fn unauthenticated_identity_is_authenticated_before_the_call() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(HttpMethod::Post, "/v2/token", 200, json!({ "access_token": "A" }));
        transport.respond_json(HttpMethod::Get, "/v2/projects/20/geofences", 200, json!([]));

        let dispatcher = dispatcher(&transport, vec![]);
        let descriptor = RequestDescriptor::get(Module::Location, "projects/20/geofences");
        let body = dispatcher.submit(IdentityKind::Application, descriptor).await.unwrap();

        assert_eq!(body.as_bytes(), b"[]");
        let paths: Vec<_> = transport.requests().iter().map(|r| r.path().to_owned()).collect();
        assert_eq!(paths, ["/v2/token", "/v2/projects/20/geofences"]);
        assert!(!dispatcher.pipeline_in_flight(IdentityKind::Application));
    }

    #[tokio::test]
    async fn failed_admission_never_sends_the_request() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(HttpMethod::Post, "/v2/token", 403, json!({}));

        let dispatcher = dispatcher(&transport, vec![]);
        let result = dispatcher
            .submit(IdentityKind::Application, RequestDescriptor::get(Module::Identity, "users/me"))
            .await;

        assert_eq!(result.unwrap_err(), BeaconError::Forbidden);
        assert_eq!(transport.count(HttpMethod::Get, "/v2/users/me"), 0);
    }

    #[tokio::test]
    async fn reauth_timeout_is_fatal() {
        let transport = Arc::new(MockTransport::new());
        transport.set_latency(Duration::from_millis(200));
        transport.respond_json(HttpMethod::Get, "/v2/users/me", 401, json!({}));
        transport.respond_json(HttpMethod::Post, "/v2/token", 200, json!({ "access_token": "B" }));

        let mut seeded = Credential::empty(IdentityKind::Application);
        seeded.access_token = Some("A".into());
        let vault = Arc::new(CredentialVault::new(Arc::new(
            InMemoryCredentialStore::with_credentials([seeded]),
        )));
        let settings = DispatcherConfig { reauth_timeout_ms: Some(50), ..DispatcherConfig::default() };
        let dispatcher = RequestDispatcher::new(
            Arc::new(test_platform_config()),
            &settings,
            transport.clone(),
            vault,
            NotificationHub::default(),
        );

        let result = dispatcher
            .submit(IdentityKind::Application, RequestDescriptor::get(Module::Identity, "users/me"))
            .await;

        let err = result.unwrap_err();
        assert_eq!(err, BeaconError::ReauthTimeout(Duration::from_millis(50)));
        assert!(err.is_offline());
    }
}
