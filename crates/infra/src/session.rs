//! Session façade
//!
//! [`PlatformSession`] wires the credential vault, the request dispatcher
//! and the event queue to their production adapters and owns the
//! background flush scheduler.
//!
//! ## Usage
//!
//! ```no_run
//! use beacon_domain::{Event, IdentityKind};
//! use beacon_infra::session::PlatformSession;
//!
//! # async fn example() -> beacon_domain::Result<()> {
//! let config = beacon_infra::config::load()?;
//! let session = PlatformSession::builder(config).build().await?;
//!
//! session.authenticate(IdentityKind::Application).await?;
//! session.track(Event::new("AppOpened")).await?;
//!
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use beacon_core::{
    AnalyticsUploader, AuthNotification, CredentialStore, CredentialVault, DeviceInfoProvider,
    EventEnricher, EventQueue, HttpTransport, LocationProvider, NotificationHub,
    PlatformUserDirectory, RequestDescriptor, RequestDispatcher, ResponseBody, ResponseParser,
    ServiceUserProvisioner, UserDirectory,
};
use beacon_domain::validation::{validate_password, validate_username};
use beacon_domain::{Config, Event, IdentityKind, Result};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, instrument, warn};

use crate::credentials;
use crate::device::{HostDeviceInfo, NoLocation};
use crate::events::FileEventStorage;
use crate::http::ReqwestTransport;
use crate::scheduling::{EventFlushScheduler, SchedulerError};

/// Builder for [`PlatformSession`].
///
/// Every adapter defaults to the production one; tests and embedding hosts
/// can inject their own.
pub struct PlatformSessionBuilder {
    config: Config,
    credential_store: Option<Arc<dyn CredentialStore>>,
    transport: Option<Arc<dyn HttpTransport>>,
    device: Option<Arc<dyn DeviceInfoProvider>>,
    location: Option<Arc<dyn LocationProvider>>,
}

impl PlatformSessionBuilder {
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn device(mut self, device: Arc<dyn DeviceInfoProvider>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn location(mut self, location: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(location);
        self
    }

    /// Validate the configuration, restore the event queue and start
    /// flushing it.
    ///
    /// # Errors
    /// - `BeaconError::Config` for an invalid configuration or HTTP client
    /// - `BeaconError::Storage` if the event mirror exists but is unreadable
    pub async fn build(self) -> Result<PlatformSession> {
        let Self { config, credential_store, transport, device, location } = self;
        config.validate()?;

        let platform = Arc::new(config.platform.clone());
        let store = credential_store.unwrap_or_else(|| credentials::store_for(&config.storage));
        let transport: Arc<dyn HttpTransport> = match transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config.http, &platform)?),
        };
        let device: Arc<dyn DeviceInfoProvider> = match device {
            Some(device) => device,
            None => Arc::new(HostDeviceInfo::default()),
        };
        let location: Arc<dyn LocationProvider> = match location {
            Some(location) => location,
            None => Arc::new(NoLocation),
        };

        let vault = Arc::new(CredentialVault::new(store));
        let notifications = NotificationHub::default();
        let dispatcher = RequestDispatcher::new(
            Arc::clone(&platform),
            &config.dispatcher,
            transport,
            Arc::clone(&vault),
            notifications,
        );

        let enricher = EventEnricher::new(Arc::clone(&platform), vault, device, location);
        let storage = Arc::new(FileEventStorage::in_dir(&config.storage.cache_dir, &config.events));
        let uploader = Arc::new(AnalyticsUploader::new(dispatcher.clone()));
        let queue = Arc::new(EventQueue::load(storage, uploader, &config.events).await?);

        let mut scheduler =
            EventFlushScheduler::new(Arc::clone(&queue), config.events.flush_interval());
        scheduler.start().await?;

        info!(
            environment = %platform.environment,
            region = %platform.region,
            pending_events = queue.len().await,
            "Platform session started"
        );

        Ok(PlatformSession { config, dispatcher, enricher, queue, scheduler: Mutex::new(scheduler) })
    }
}

/// One client of the platform: three identities, one dispatch queue and one
/// telemetry queue.
pub struct PlatformSession {
    config: Config,
    dispatcher: RequestDispatcher,
    enricher: EventEnricher,
    queue: Arc<EventQueue>,
    scheduler: Mutex<EventFlushScheduler>,
}

impl PlatformSession {
    pub fn builder(config: Config) -> PlatformSessionBuilder {
        PlatformSessionBuilder {
            config,
            credential_store: None,
            transport: None,
            device: None,
            location: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn events(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn notifications(&self) -> broadcast::Receiver<AuthNotification> {
        self.dispatcher.notifications().subscribe()
    }

    /// # Errors
    /// See [`RequestDispatcher::authenticate`].
    pub async fn authenticate(&self, kind: IdentityKind) -> Result<()> {
        self.dispatcher.authenticate(kind).await
    }

    /// # Errors
    /// See [`RequestDispatcher::submit_with`].
    pub async fn submit(
        &self,
        kind: IdentityKind,
        descriptor: RequestDescriptor,
    ) -> Result<ResponseBody> {
        self.dispatcher.submit(kind, descriptor).await
    }

    /// # Errors
    /// See [`RequestDispatcher::submit_with`].
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
        self.dispatcher.submit_with(kind, descriptor, parser).await
    }

    /// Enrich `event` and queue it for upload.
    ///
    /// A record that could not be persisted is still queued in memory, so
    /// that failure is only logged.
    ///
    /// # Errors
    /// Returns `InvalidInput(InvalidEvent)` for a blank event type, or the
    /// credential store's error while reading the user identity.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn track(&self, event: Event) -> Result<()> {
        let record = self.enricher.prepare(event).await?;
        if let Err(err) = self.queue.enqueue(record).await {
            warn!(error = %err, "Queued event could not be persisted");
        }
        Ok(())
    }

    pub async fn pause_events(&self) {
        self.queue.stop().await;
    }

    pub async fn resume_events(&self) {
        self.queue.start().await;
    }

    /// Log a developer in as the interactive user.
    ///
    /// The password is only held for the duration of this call. Requests
    /// for the preferred user identity run as this user once it succeeds.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank username or a weak password
    /// - the authentication pipeline's error
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        validate_username(username)?;
        validate_password(password)?;

        let vault = self.dispatcher.vault();
        vault.update_credentials(IdentityKind::InteractiveUser, username, password).await?;
        vault.set_interactive_login(false);

        let outcome = self.dispatcher.authenticate(IdentityKind::InteractiveUser).await;
        vault.clear_password(IdentityKind::InteractiveUser).await;

        outcome?;
        vault.set_interactive_login(true);
        info!("Interactive user logged in");
        Ok(())
    }

    /// # Errors
    /// Returns the credential store's error from resetting the slot.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let vault = self.dispatcher.vault();
        vault.set_interactive_login(false);
        vault.reset(IdentityKind::InteractiveUser).await?;
        info!("Interactive user logged out");
        Ok(())
    }

    /// Directory backed by the platform's identity module.
    pub fn user_directory(&self) -> PlatformUserDirectory {
        PlatformUserDirectory::new(self.dispatcher.clone())
    }

    /// Make sure a service user exists and is authenticated, creating one
    /// through `directory` if needed.
    ///
    /// # Errors
    /// See [`ServiceUserProvisioner::ensure`].
    pub async fn ensure_service_user(&self, directory: &dyn UserDirectory) -> Result<()> {
        ServiceUserProvisioner::new(self.dispatcher.clone()).ensure(directory).await
    }

    /// Stop the flush scheduler. Queued events stay on disk for the next
    /// session.
    ///
    /// # Errors
    /// Returns `BeaconError::Internal` if the scheduler task did not stop.
    pub async fn shutdown(&self) -> Result<()> {
        match self.scheduler.lock().await.stop().await {
            Ok(()) | Err(SchedulerError::NotRunning) => {
                info!("Platform session stopped");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
