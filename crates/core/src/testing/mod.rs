//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scripted and in-memory implementations of every core port
//! - [`test_platform_config`]: a valid configuration pointing at the
//!   production host names

pub mod mocks;

use beacon_domain::PlatformConfig;
pub use mocks::{
    FixedLocation, InMemoryCredentialStore, InMemoryEventStorage, MockTransport,
    ScriptedUploader, StaticDeviceInfo,
};

/// Platform settings that pass validation. Requests resolve to
/// `https://{module}.phoenixplatform.com/v2/...`.
pub fn test_platform_config() -> PlatformConfig {
    PlatformConfig {
        client_id: "test-client".into(),
        client_secret: "test-secret".into(),
        application_id: 10,
        project_id: 20,
        company_id: 30,
        sdk_user_role: 40,
        ..PlatformConfig::default()
    }
}
