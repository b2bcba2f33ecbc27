//! Tracing subscriber setup.

use beacon_domain::{BeaconError, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// The filter to install: `RUST_LOG` when set and valid, otherwise the
/// configured directive.
///
/// # Errors
/// Returns `BeaconError::Config` if the configured directive is invalid.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| BeaconError::Config(format!("Invalid log filter {:?}: {e}", config.filter)))
}

/// Install the global subscriber.
///
/// Human-readable output by default, one JSON object per line when
/// `config.json` is set.
///
/// # Errors
/// - `BeaconError::Config` if the filter directive is invalid
/// - `BeaconError::Internal` if a global subscriber is already installed,
///   by this function or by the host application. The existing one is kept.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| BeaconError::Internal(format!("Tracing already initialized: {e}")))
}
