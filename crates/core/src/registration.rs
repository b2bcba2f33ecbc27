//! One-shot guards for installation registration.
//!
//! An installation is created once per install and updated once per
//! application version. These checks run before any request is built so a
//! repeated call costs nothing.

use beacon_domain::validation;
use beacon_domain::{BeaconError, Result};
use tracing::debug;

/// What is known locally about the installation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationGuard {
    /// Application version last registered with the backend, if any.
    pub installed_version: Option<String>,
    pub current_version: String,
}

impl InstallationGuard {
    pub fn new(installed_version: Option<String>, current_version: impl Into<String>) -> Self {
        Self { installed_version, current_version: current_version.into() }
    }

    pub const fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }

    /// # Errors
    /// Returns `AlreadyInstalled` once an installation was registered.
    pub fn check_create(&self) -> Result<()> {
        if self.is_installed() {
            debug!("Installation already registered");
            return Err(BeaconError::AlreadyInstalled);
        }
        Ok(())
    }

    /// # Errors
    /// - `AlreadyUpdated` when the registered version is the current one
    /// - `Internal` when nothing was registered yet, since there is no
    ///   record to update
    pub fn check_update(&self) -> Result<()> {
        match self.installed_version.as_deref() {
            None => Err(BeaconError::Internal("no installation registered to update".into())),
            Some(installed) if installed == self.current_version => {
                debug!(version = installed, "Installation already up to date");
                Err(BeaconError::AlreadyUpdated)
            }
            Some(_) => Ok(()),
        }
    }

    /// Record a successful create or update.
    pub fn mark_registered(&mut self) {
        self.installed_version = Some(self.current_version.clone());
    }
}

/// # Errors
/// Returns `InvalidInput(EmptyDeviceToken)` for an empty or blank token.
pub fn validate_device_token(token: &str) -> Result<()> {
    validation::validate_device_token(token)
}
