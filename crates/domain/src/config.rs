//! Configuration structures
//!
//! `Config` is deserialized from JSON or TOML (see `beacon_infra::config`)
//! or assembled from environment variables. Only the `platform` section is
//! required; every other section falls back to its defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    API_VERSION, DEFAULT_CACHE_DIR, DEFAULT_EVENTS_FILE, DEFAULT_FLUSH_INTERVAL_MS,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_MAX_BATCH, DEFAULT_RETRY_BUDGET,
    PLATFORM_HOST,
};
use crate::errors::{BeaconError, Result};
use crate::impl_domain_status_conversions;

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub events: EventQueueConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate every section.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.platform.validate()?;
        self.events.validate()
    }
}

/// Deployment region of the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Au,
    Eu,
    Sg,
}

impl_domain_status_conversions!(Region {
    Us => "us",
    Au => "au",
    Eu => "eu",
    Sg => "sg",
});

impl Region {
    /// Top-level domain suffix of the region's hosts.
    pub const fn host_suffix(self) -> &'static str {
        match self {
            Self::Us => ".com",
            Self::Au => ".com.au",
            Self::Eu => ".eu",
            Self::Sg => ".com.sg",
        }
    }
}

/// Platform environment the client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Development,
    Integration,
    Uat,
    Staging,
    #[default]
    Production,
}

impl_domain_status_conversions!(Environment {
    Local => "local",
    Development => "development",
    Integration => "integration",
    Uat => "uat",
    Staging => "staging",
    Production => "production",
});

impl Environment {
    /// Suffix appended to the module name in the host.
    pub const fn host_suffix(self) -> &'static str {
        match self {
            Self::Local => "-local",
            Self::Development => "-dev",
            Self::Integration => "-int",
            Self::Uat => "-uat",
            Self::Staging => "-staging",
            Self::Production => "",
        }
    }
}

/// Backend service a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Authentication,
    Identity,
    Analytics,
    Location,
}

impl_domain_status_conversions!(Module {
    Authentication => "authentication",
    Identity => "identity",
    Analytics => "analytics",
    Location => "location",
});

/// Which server certificates the HTTP transport accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateTrustPolicy {
    #[default]
    Valid,
    Any,
    AnyNonProduction,
}

impl_domain_status_conversions!(CertificateTrustPolicy {
    Valid => "valid",
    Any => "any",
    AnyNonProduction => "any_non_production",
});

impl CertificateTrustPolicy {
    /// Whether invalid certificates are accepted in `environment`.
    pub fn accepts_invalid_certs(self, environment: Environment) -> bool {
        match self {
            Self::Valid => false,
            Self::Any => true,
            Self::AnyNonProduction => environment != Environment::Production,
        }
    }
}

/// Platform account and addressing settings.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub client_id: String,
    pub client_secret: String,
    pub application_id: i64,
    pub project_id: i64,
    pub company_id: i64,
    pub sdk_user_role: i64,
    #[serde(default)]
    pub region: Region,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub certificate_trust_policy: CertificateTrustPolicy,
    #[serde(default)]
    pub base_url_override: Option<String>,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("project_id", &self.project_id)
            .field("company_id", &self.company_id)
            .field("sdk_user_role", &self.sdk_user_role)
            .field("region", &self.region)
            .field("environment", &self.environment)
            .field("certificate_trust_policy", &self.certificate_trust_policy)
            .field("base_url_override", &self.base_url_override)
            .finish()
    }
}

impl PlatformConfig {
    /// # Errors
    /// Returns `BeaconError::Config` for empty client credentials,
    /// non-positive identifiers or an unparsable override URL.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(BeaconError::Config("client_id must not be empty".into()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(BeaconError::Config("client_secret must not be empty".into()));
        }

        let ids = [
            ("application_id", self.application_id),
            ("project_id", self.project_id),
            ("company_id", self.company_id),
            ("sdk_user_role", self.sdk_user_role),
        ];
        for (field, value) in ids {
            if value <= 0 {
                return Err(BeaconError::Config(format!("{field} must be positive, got {value}")));
            }
        }

        if let Some(base) = &self.base_url_override {
            Url::parse(base)
                .map_err(|e| BeaconError::Config(format!("Invalid base_url_override: {e}")))?;
        }

        Ok(())
    }

    /// Absolute URL of `path` on the given backend module.
    pub fn endpoint_url(&self, module: Module, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match &self.base_url_override {
            Some(base) => format!("{}/{API_VERSION}/{path}", base.trim_end_matches('/')),
            None => format!(
                "https://{module}{}.{PLATFORM_HOST}{}/{API_VERSION}/{path}",
                self.environment.host_suffix(),
                self.region.host_suffix(),
            ),
        }
    }

    /// Whether the HTTP transport should accept invalid certificates.
    pub fn accepts_invalid_certs(&self) -> bool {
        self.certificate_trust_policy.accepts_invalid_certs(self.environment)
    }
}

/// Authenticated request dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Reauthenticate-and-replay attempts after a 401.
    pub retry_budget: u8,
    /// Upper bound on waiting for a reauthentication pipeline.
    pub reauth_timeout_ms: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { retry_budget: DEFAULT_RETRY_BUDGET, reauth_timeout_ms: None }
    }
}

impl DispatcherConfig {
    pub fn reauth_timeout(&self) -> Option<Duration> {
        self.reauth_timeout_ms.map(Duration::from_millis)
    }
}

/// Telemetry queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventQueueConfig {
    pub flush_interval_ms: u64,
    pub max_batch: usize,
    pub file_name: String,
    pub start_paused: bool,
}

impl Default for EventQueueConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            max_batch: DEFAULT_MAX_BATCH,
            file_name: DEFAULT_EVENTS_FILE.to_string(),
            start_paused: false,
        }
    }
}

impl EventQueueConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// # Errors
    /// Returns `BeaconError::Config` for a zero interval, zero batch size or
    /// empty file name.
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_ms == 0 {
            return Err(BeaconError::Config("events.flush_interval_ms must be positive".into()));
        }
        if self.max_batch == 0 {
            return Err(BeaconError::Config("events.max_batch must be positive".into()));
        }
        if self.file_name.trim().is_empty() {
            return Err(BeaconError::Config("events.file_name must not be empty".into()));
        }
        Ok(())
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS, user_agent: None }
    }
}

/// Where credentials are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    Keychain,
    File,
}

impl_domain_status_conversions!(CredentialBackend {
    Keychain => "keychain",
    File => "file",
});

/// Local persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub cache_dir: PathBuf,
    pub credential_backend: CredentialBackend,
    pub keychain_service: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            credential_backend: CredentialBackend::default(),
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}
