//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment, if one exists
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `BEACON_CLIENT_ID`, `BEACON_CLIENT_SECRET`: OAuth client credentials
//! - `BEACON_APPLICATION_ID`, `BEACON_PROJECT_ID`, `BEACON_COMPANY_ID`
//! - `BEACON_SDK_USER_ROLE`: role granted to the service user
//! - `BEACON_REGION`: `us`, `au`, `eu` or `sg`
//! - `BEACON_ENVIRONMENT`: `local`, `development`, `integration`, `uat`,
//!   `staging` or `production`
//!
//! Optional:
//! - `BEACON_CERTIFICATE_TRUST`: `valid`, `any` or `any_non_production`
//! - `BEACON_BASE_URL`: host override, mostly for tests
//! - `BEACON_RETRY_BUDGET`, `BEACON_REAUTH_TIMEOUT_MS`
//! - `BEACON_FLUSH_INTERVAL_MS`, `BEACON_MAX_BATCH`, `BEACON_EVENTS_FILE`,
//!   `BEACON_EVENTS_PAUSED`
//! - `BEACON_HTTP_TIMEOUT_SECS`, `BEACON_USER_AGENT`
//! - `BEACON_CACHE_DIR`, `BEACON_CREDENTIAL_BACKEND`, `BEACON_KEYCHAIN_SERVICE`
//! - `BEACON_LOG_FILTER`, `BEACON_LOG_JSON`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./beacon.{json,toml}` or `./config.{json,toml}` (current working
//!    directory)
//! 2. The same names in the parent and grandparent directories
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use beacon_domain::{
    BeaconError, Config, DispatcherConfig, EventQueueConfig, HttpConfig, LoggingConfig,
    PlatformConfig, Result, StorageConfig,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["beacon.json", "beacon.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file. The
/// result is validated either way.
///
/// # Errors
/// Returns `BeaconError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A setting fails validation
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// All required environment variables must be present. Optional variables
/// override the section defaults.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `BeaconError::Config` if required variables are missing
/// or any variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let platform = PlatformConfig {
        client_id: env_var("BEACON_CLIENT_ID")?,
        client_secret: env_var("BEACON_CLIENT_SECRET")?,
        application_id: env_parse("BEACON_APPLICATION_ID")?,
        project_id: env_parse("BEACON_PROJECT_ID")?,
        company_id: env_parse("BEACON_COMPANY_ID")?,
        sdk_user_role: env_parse("BEACON_SDK_USER_ROLE")?,
        region: env_parse("BEACON_REGION")?,
        environment: env_parse("BEACON_ENVIRONMENT")?,
        certificate_trust_policy: env_parse_or("BEACON_CERTIFICATE_TRUST", Default::default())?,
        base_url_override: std::env::var("BEACON_BASE_URL").ok(),
    };

    let dispatcher_defaults = DispatcherConfig::default();
    let dispatcher = DispatcherConfig {
        retry_budget: env_parse_or("BEACON_RETRY_BUDGET", dispatcher_defaults.retry_budget)?,
        reauth_timeout_ms: env_parse_opt("BEACON_REAUTH_TIMEOUT_MS")?,
    };

    let event_defaults = EventQueueConfig::default();
    let events = EventQueueConfig {
        flush_interval_ms: env_parse_or(
            "BEACON_FLUSH_INTERVAL_MS",
            event_defaults.flush_interval_ms,
        )?,
        max_batch: env_parse_or("BEACON_MAX_BATCH", event_defaults.max_batch)?,
        file_name: std::env::var("BEACON_EVENTS_FILE").unwrap_or(event_defaults.file_name),
        start_paused: env_bool("BEACON_EVENTS_PAUSED", event_defaults.start_paused),
    };

    let http_defaults = HttpConfig::default();
    let http = HttpConfig {
        timeout_secs: env_parse_or("BEACON_HTTP_TIMEOUT_SECS", http_defaults.timeout_secs)?,
        user_agent: std::env::var("BEACON_USER_AGENT").ok(),
    };

    let storage_defaults = StorageConfig::default();
    let storage = StorageConfig {
        cache_dir: std::env::var("BEACON_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(storage_defaults.cache_dir),
        credential_backend: env_parse_or(
            "BEACON_CREDENTIAL_BACKEND",
            storage_defaults.credential_backend,
        )?,
        keychain_service: std::env::var("BEACON_KEYCHAIN_SERVICE")
            .unwrap_or(storage_defaults.keychain_service),
    };

    let logging_defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        filter: std::env::var("BEACON_LOG_FILTER").unwrap_or(logging_defaults.filter),
        json: env_bool("BEACON_LOG_JSON", logging_defaults.json),
    };

    Ok(Config { platform, dispatcher, events, http, storage, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `BeaconError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BeaconError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BeaconError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BeaconError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `BeaconError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BeaconError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BeaconError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(BeaconError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent and grandparent, and
/// the same three levels around the executable, trying every name in
/// [`CONFIG_FILE_NAMES`] at each level.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| [root.clone(), root.join(".."), root.join("../..")])
        .flat_map(|dir| CONFIG_FILE_NAMES.map(|name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `BeaconError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| BeaconError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse a required environment variable.
fn env_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_var(key)?;
    raw.trim().parse().map_err(|e| BeaconError::Config(format!("Invalid {key}: {e}")))
}

/// Parse an optional environment variable.
fn env_parse_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(_) => env_parse(key).map(Some),
        Err(_) => Ok(None),
    }
}

fn env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_parse_opt(key)?.unwrap_or(default))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use beacon_domain::{CertificateTrustPolicy, CredentialBackend, Environment, Region};
    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const REQUIRED: [(&str, &str); 8] = [
        ("BEACON_CLIENT_ID", "client"),
        ("BEACON_CLIENT_SECRET", "secret"),
        ("BEACON_APPLICATION_ID", "10"),
        ("BEACON_PROJECT_ID", "20"),
        ("BEACON_COMPANY_ID", "30"),
        ("BEACON_SDK_USER_ROLE", "40"),
        ("BEACON_REGION", "eu"),
        ("BEACON_ENVIRONMENT", "staging"),
    ];

    const OPTIONAL: [&str; 15] = [
        "BEACON_CERTIFICATE_TRUST",
        "BEACON_BASE_URL",
        "BEACON_RETRY_BUDGET",
        "BEACON_REAUTH_TIMEOUT_MS",
        "BEACON_FLUSH_INTERVAL_MS",
        "BEACON_MAX_BATCH",
        "BEACON_EVENTS_FILE",
        "BEACON_EVENTS_PAUSED",
        "BEACON_HTTP_TIMEOUT_SECS",
        "BEACON_USER_AGENT",
        "BEACON_CACHE_DIR",
        "BEACON_CREDENTIAL_BACKEND",
        "BEACON_KEYCHAIN_SERVICE",
        "BEACON_LOG_FILTER",
        "BEACON_LOG_JSON",
    ];

    fn set_required() {
        for (key, value) in REQUIRED {
            std::env::set_var(key, value);
        }
    }

    fn clear_all() {
        for (key, _) in REQUIRED {
            std::env::remove_var(key);
        }
        for key in OPTIONAL {
            std::env::remove_var(key);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for value in ["1", "true", "yes", "on", "TRUE"] {
            std::env::set_var("BEACON_TEST_BOOL", value);
            assert!(env_bool("BEACON_TEST_BOOL", false), "{value} should be true");
        }
        for value in ["0", "false", "no", "off"] {
            std::env::set_var("BEACON_TEST_BOOL", value);
            assert!(!env_bool("BEACON_TEST_BOOL", true), "{value} should be false");
        }

        std::env::remove_var("BEACON_TEST_BOOL");
        assert!(env_bool("BEACON_TEST_BOOL", true));
        assert!(!env_bool("BEACON_TEST_BOOL", false));
    }

    #[test]
    fn test_load_from_env_required_only() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();

        let config = load_from_env().unwrap();
        assert_eq!(config.platform.client_id, "client");
        assert_eq!(config.platform.sdk_user_role, 40);
        assert_eq!(config.platform.region, Region::Eu);
        assert_eq!(config.platform.environment, Environment::Staging);
        assert_eq!(config.platform.certificate_trust_policy, CertificateTrustPolicy::Valid);
        assert_eq!(config.dispatcher, DispatcherConfig::default());
        assert_eq!(config.events, EventQueueConfig::default());
        assert_eq!(config.storage, StorageConfig::default());
        assert!(config.validate().is_ok());

        clear_all();
    }

    #[test]
    fn test_load_from_env_with_overrides() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();
        std::env::set_var("BEACON_CERTIFICATE_TRUST", "any_non_production");
        std::env::set_var("BEACON_RETRY_BUDGET", "4");
        std::env::set_var("BEACON_REAUTH_TIMEOUT_MS", "2500");
        std::env::set_var("BEACON_MAX_BATCH", "25");
        std::env::set_var("BEACON_EVENTS_PAUSED", "yes");
        std::env::set_var("BEACON_CREDENTIAL_BACKEND", "file");
        std::env::set_var("BEACON_LOG_JSON", "1");

        let config = load_from_env().unwrap();
        assert_eq!(
            config.platform.certificate_trust_policy,
            CertificateTrustPolicy::AnyNonProduction
        );
        assert!(config.platform.accepts_invalid_certs());
        assert_eq!(config.dispatcher.retry_budget, 4);
        assert_eq!(config.dispatcher.reauth_timeout_ms, Some(2500));
        assert_eq!(config.events.max_batch, 25);
        assert!(config.events.start_paused);
        assert_eq!(config.storage.credential_backend, CredentialBackend::File);
        assert!(config.logging.json);

        clear_all();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();
        std::env::remove_var("BEACON_CLIENT_SECRET");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, BeaconError::Config(ref msg) if msg.contains("BEACON_CLIENT_SECRET")));

        clear_all();
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();

        std::env::set_var("BEACON_PROJECT_ID", "not-a-number");
        assert!(matches!(load_from_env(), Err(BeaconError::Config(_))));

        std::env::set_var("BEACON_PROJECT_ID", "20");
        std::env::set_var("BEACON_REGION", "mars");
        let err = load_from_env().unwrap_err();
        assert!(matches!(err, BeaconError::Config(ref msg) if msg.contains("mars")));

        clear_all();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = write_temp(
            r#"{
                "platform": {
                    "client_id": "client",
                    "client_secret": "secret",
                    "application_id": 1,
                    "project_id": 2,
                    "company_id": 3,
                    "sdk_user_role": 4,
                    "region": "au"
                },
                "events": { "max_batch": 50 }
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.platform.region, Region::Au);
        assert_eq!(config.platform.environment, Environment::Production);
        assert_eq!(config.events.max_batch, 50);
        assert_eq!(config.events.flush_interval_ms, 1_000);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = write_temp(
            r#"
[platform]
client_id = "client"
client_secret = "secret"
application_id = 1
project_id = 2
company_id = 3
sdk_user_role = 4
environment = "uat"
certificate_trust_policy = "any"

[storage]
credential_backend = "file"
cache_dir = "/tmp/beacon-cache"
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.platform.environment, Environment::Uat);
        assert!(config.platform.accepts_invalid_certs());
        assert_eq!(config.storage.credential_backend, CredentialBackend::File);
        assert_eq!(config.storage.cache_dir, PathBuf::from("/tmp/beacon-cache"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/beacon.json")));
        assert!(matches!(result, Err(BeaconError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = write_temp(r#"{ "this is": "not valid json" "#, "json");

        let result = load_from_file(Some(path.clone()));
        assert!(matches!(result, Err(BeaconError::Config(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", Path::new("beacon.yaml"));
        assert!(matches!(result, Err(BeaconError::Config(ref msg)) if msg.contains("yaml")));
    }

    #[test]
    fn test_parse_config_requires_platform_section() {
        let result = parse_config(r#"{ "events": {} }"#, Path::new("beacon.json"));
        assert!(result.is_err());
    }
}
