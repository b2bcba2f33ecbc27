//! Error types used throughout the client

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Beacon
///
/// Every variant maps to a stable numeric [`code`](BeaconError::code) so
/// hosts that surface errors across an FFI or UI boundary can switch on it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum BeaconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Response could not be parsed: {0}")]
    Parse(String),

    #[error("Network offline")]
    NetworkOffline,

    #[error("Unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),

    #[error("Forbidden")]
    Forbidden,

    #[error("Unhandled HTTP status {status}")]
    UnhandledHttp { status: u16, error_code: Option<String> },

    #[error("Could not reauthenticate")]
    CouldNotReauthenticate,

    #[error("Timed out after {0:?} waiting for reauthentication")]
    ReauthTimeout(Duration),

    #[error("Invalid input: {0}")]
    InvalidInput(InvalidInputReason),

    #[error("Installation already exists")]
    AlreadyInstalled,

    #[error("Installation is already up to date")]
    AlreadyUpdated,

    #[error("Events rejected by the backend")]
    EventsRejected,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BeaconError {
    /// Stable numeric code for this error.
    pub const fn code(&self) -> u32 {
        match self {
            Self::Config(_) => 1001,
            Self::Parse(_) => 2001,
            Self::NetworkOffline => 2003,
            Self::Unauthorized(reason) => reason.code(),
            Self::Forbidden => 2005,
            Self::UnhandledHttp { .. } => 2006,
            Self::CouldNotReauthenticate => 2007,
            Self::ReauthTimeout(_) => 2008,
            Self::InvalidInput(reason) => reason.code(),
            Self::AlreadyInstalled => 5001,
            Self::AlreadyUpdated => 5002,
            Self::EventsRejected => 6001,
            Self::Storage(_) => 7001,
            Self::Internal(_) => 9001,
        }
    }

    /// True for failures caused by missing connectivity rather than by the
    /// backend's answer.
    pub const fn is_offline(&self) -> bool {
        matches!(self, Self::NetworkOffline | Self::ReauthTimeout(_))
    }

    /// The unauthorized reason, if this is an authentication rejection.
    pub const fn unauthorized_reason(&self) -> Option<UnauthorizedReason> {
        match self {
            Self::Unauthorized(reason) => Some(*reason),
            _ => None,
        }
    }

    /// HTTP status carried by the error, if any.
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::UnhandledHttp { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden => Some(403),
            _ => None,
        }
    }
}

/// Why the authorization server refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedReason {
    CredentialIncorrect,
    AccountDisabled,
    AccountLocked,
    TokenInvalidOrExpired,
    Generic,
}

impl UnauthorizedReason {
    const fn code(self) -> u32 {
        match self {
            Self::CredentialIncorrect => 3001,
            Self::AccountDisabled => 3002,
            Self::AccountLocked => 3003,
            Self::TokenInvalidOrExpired => 3004,
            Self::Generic => 2004,
        }
    }
}

impl fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::CredentialIncorrect => "credentials incorrect",
            Self::AccountDisabled => "account disabled",
            Self::AccountLocked => "account locked",
            Self::TokenInvalidOrExpired => "token invalid or expired",
            Self::Generic => "request not authorized",
        };
        f.write_str(text)
    }
}

/// Caller input that was rejected before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidInputReason {
    WeakPassword,
    EmptyDeviceToken,
    EmptyUsername,
    InvalidEvent,
}

impl InvalidInputReason {
    const fn code(self) -> u32 {
        match self {
            Self::WeakPassword => 4001,
            Self::EmptyDeviceToken => 4002,
            Self::EmptyUsername => 4003,
            Self::InvalidEvent => 4004,
        }
    }
}

impl fmt::Display for InvalidInputReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::WeakPassword => {
                "password must have at least 8 characters including upper case, lower case and a digit"
            }
            Self::EmptyDeviceToken => "device token must not be empty",
            Self::EmptyUsername => "username must not be empty",
            Self::InvalidEvent => "event type must not be empty",
        };
        f.write_str(text)
    }
}

/// Result type alias for Beacon operations
pub type Result<T> = std::result::Result<T, BeaconError>;
