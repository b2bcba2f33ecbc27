//! Conversions from external infrastructure errors into domain errors.

use std::time::Duration;

use beacon_common::error::{CommonError, ErrorClassification};
use beacon_common::security::KeychainError;
use beacon_common::storage::StorageError;
use beacon_core::TransportError;
use beacon_domain::BeaconError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BeaconError);

impl From<InfraError> for BeaconError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BeaconError> for InfraError {
    fn from(value: BeaconError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBeaconError {
    fn into_beacon(self) -> BeaconError;
}

/* -------------------------------------------------------------------------- */
/* beacon_common errors → BeaconError */
/* -------------------------------------------------------------------------- */

impl IntoBeaconError for KeychainError {
    fn into_beacon(self) -> BeaconError {
        match self {
            KeychainError::NotFound => BeaconError::Storage("keychain entry not found".into()),
            KeychainError::AccessFailed(reason) => {
                BeaconError::Storage(format!("keychain unavailable: {reason}"))
            }
        }
    }
}

impl IntoBeaconError for StorageError {
    fn into_beacon(self) -> BeaconError {
        match self {
            StorageError::Corrupt { path, reason } => {
                BeaconError::Storage(format!("corrupt data in {path}: {reason}"))
            }
            StorageError::Common(err) => err.into_beacon(),
        }
    }
}

impl IntoBeaconError for CommonError {
    fn into_beacon(self) -> BeaconError {
        BeaconError::Storage(self.to_string())
    }
}

// Adapter failures are logged once, at their classified severity, where they
// leave the adapter layer.
impl From<KeychainError> for InfraError {
    fn from(value: KeychainError) -> Self {
        value.log("Keychain operation failed");
        InfraError(value.into_beacon())
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        value.log("File storage operation failed");
        InfraError(value.into_beacon())
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(BeaconError::Storage(format!("stored record is not valid JSON: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

/// Classify a client failure that produced no HTTP response.
pub trait IntoTransportError {
    /// `timeout` is the client's configured request timeout, reported back
    /// when the request ran out of time.
    fn into_transport(self, timeout: Duration) -> TransportError;
}

impl IntoTransportError for HttpError {
    fn into_transport(self, timeout: Duration) -> TransportError {
        if self.is_timeout() {
            return TransportError::Timeout(timeout);
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return TransportError::Offline(self.to_string());
        }

        TransportError::Other(self.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
