//! Client constants
//!
//! Centralized location for the domain-level constants shared by the
//! pipeline, dispatcher and event queue.

// Platform addressing
pub const API_VERSION: &str = "v2";
pub const PLATFORM_HOST: &str = "phoenixplatform";

// Request retry
pub const DEFAULT_RETRY_BUDGET: u8 = 2;

// Event queue
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_MAX_BATCH: usize = 100;
pub const DEFAULT_EVENTS_FILE: &str = "Events.json";

// Service user provisioning
pub const SERVICE_USER_CREATION_ATTEMPTS: usize = 4;
pub const GENERATED_PASSWORD_GROUP_LEN: usize = 3;

// Password rules
pub const MIN_PASSWORD_LENGTH: usize = 8;

// Storage
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "beacon.credentials";
pub const DEFAULT_CACHE_DIR: &str = ".beacon";

// HTTP
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Field names of an uploaded telemetry record.
pub mod event_keys {
    pub const EVENT_TYPE: &str = "EventType";
    pub const EVENT_VALUE: &str = "EventValue";
    pub const EVENT_DATE: &str = "EventDate";
    pub const TARGET_ID: &str = "TargetId";
    pub const METADATA: &str = "Metadata";
    pub const PROJECT_ID: &str = "ProjectId";
    pub const APPLICATION_ID: &str = "PhoenixIdentity_ApplicationId";
    pub const DEVICE_TYPE: &str = "DeviceType";
    pub const OS_VERSION: &str = "OperatingSystemVersion";
    pub const APPLICATION_VERSION: &str = "ApplicationVersion";
    pub const INSTALLATION_ID: &str = "PhoenixIdentity_InstallationId";
    pub const USER_ID: &str = "PhoenixIdentity_UserId";
    pub const GEOLOCATION: &str = "Geolocation";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
}
