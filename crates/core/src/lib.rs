//! # Beacon Core
//!
//! Authentication and telemetry logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - The Validate → Refresh → Login authentication pipeline
//! - The request dispatcher and its reauthenticate-and-replay state machine
//! - The durable, batch-capped event queue
//! - Port interfaces (traits) for HTTP, credential storage and device probes
//!
//! ## Architecture Principles
//! - Only depends on `beacon-common` and `beacon-domain`
//! - No reqwest, keychain or filesystem code
//! - All external dependencies via traits

pub mod auth;
pub mod dispatch;
pub mod events;
pub mod http;
pub mod registration;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use auth::directory::PlatformUserDirectory;
pub use auth::notifications::{AuthNotification, NotificationHub};
pub use auth::pipeline::{AuthenticationPipeline, PipelineMode, PipelineStep};
pub use auth::ports::{CredentialStore, NewUser, UserDirectory};
pub use auth::provisioning::ServiceUserProvisioner;
pub use auth::vault::CredentialVault;
pub use dispatch::{JsonParser, RawBody, RequestDescriptor, RequestDispatcher, ResponseBody, ResponseParser};
pub use events::ports::{
    DeviceInfo, DeviceInfoProvider, EventStorage, EventUploader, LocationProvider, UploadOutcome,
};
pub use events::{AnalyticsUploader, EventEnricher, EventQueue};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody, TransportError};
pub use registration::{validate_device_token, InstallationGuard};
