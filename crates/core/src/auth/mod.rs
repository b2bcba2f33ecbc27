//! Credential lifecycle: storage port, in-memory vault, the authentication
//! pipeline and service-user provisioning.

pub mod classification;
pub mod directory;
pub mod grant;
pub mod notifications;
pub mod pipeline;
pub mod ports;
pub mod provisioning;
pub mod vault;

pub use classification::classify_oauth_error;
pub use directory::PlatformUserDirectory;
pub use notifications::{AuthNotification, NotificationHub};
pub use pipeline::{AuthenticationPipeline, PipelineMode, PipelineRun, PipelineStep};
pub use ports::{CredentialStore, NewUser, UserDirectory};
pub use provisioning::ServiceUserProvisioner;
pub use vault::CredentialVault;
