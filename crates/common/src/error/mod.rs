//! Common error types and utilities
//!
//! This module provides the error infrastructure shared by the Beacon
//! adapters:
//!
//! 1. **`CommonError`**: the failures every file-backed adapter can hit,
//!    reading or writing bytes and (de)serializing them.
//!
//! 2. **`ErrorClassification` trait**: maps an error to an [`ErrorSeverity`],
//!    which decides the level it is logged at when it leaves an adapter.
//!
//! ## Composition
//!
//! Adapter-specific errors embed `CommonError` instead of duplicating its
//! variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum StorageError {
//!     #[error("Stored data is corrupt: {0}")]
//!     Corrupt(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_classification!(StorageError, Common,
//!     Self::Corrupt(_) => ErrorSeverity::Critical,
//! );
//! ```
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Logged as | Examples |
//! |-------|-----------|----------|
//! | **Info** | `info` | Missing keychain entry |
//! | **Warning** | `warn` | Network unreachable |
//! | **Error** | `error` | Unreadable files, locked keychain |
//! | **Critical** | `error`, flagged `critical` | Corrupt stored data |

use std::fmt;

/// Common error variants that appear across multiple modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Serialization or deserialization errors
    Serialization { message: String, format: Option<String> },

    /// Data persistence errors (file I/O)
    Persistence { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization { message, format } => {
                if let Some(format) = format {
                    write!(f, "Serialization error ({}): {}", format, message)
                } else {
                    write!(f, "Serialization error: {}", message)
                }
            }
            Self::Persistence { message } => write!(f, "Persistence error: {}", message),
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}

impl CommonError {
    /// Create a serialization error with format information
    pub fn serialization_format<S: Into<String>, F: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    /// Create a persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence { message: message.into() }
    }
}

/// Error classification trait for consistent error reporting across modules
pub trait ErrorClassification: fmt::Display {
    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Log this error at the level its severity maps to.
    #[cfg(feature = "observability")]
    fn log(&self, message: &str) {
        match self.severity() {
            ErrorSeverity::Info => tracing::info!(error = %self, "{message}"),
            ErrorSeverity::Warning => tracing::warn!(error = %self, "{message}"),
            ErrorSeverity::Error => tracing::error!(error = %self, "{message}"),
            ErrorSeverity::Critical => {
                tracing::error!(error = %self, critical = true, "{message}");
            }
        }
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Expected condition, typically for debugging
    Info,
    /// Degraded but operational
    Warning,
    /// Failure requiring attention
    Error,
    /// Stored state can no longer be trusted
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

// Standard conversions from common error types
impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

/// Utility macro for creating error conversions from std types
///
/// Generates `From<serde_json::Error>` and `From<std::io::Error>` for a
/// module error that embeds `CommonError` in `$variant`. `From<CommonError>`
/// itself comes from `#[from]` on that variant.
///
/// ```rust,ignore
/// impl_error_conversion!(StorageError, Common);
/// ```
#[macro_export]
macro_rules! impl_error_conversion {
    ($error_type:ty, $variant:ident) => {
        impl From<serde_json::Error> for $error_type {
            fn from(err: serde_json::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }

        impl From<std::io::Error> for $error_type {
            fn from(err: std::io::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }
    };
}

/// Macro to implement ErrorClassification by delegating to CommonError
///
/// ```rust,ignore
/// impl_error_classification!(MyError, Common,
///     Self::Specific(_) => ErrorSeverity::Warning,
/// );
/// ```
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(, $variant:pat => $severity:expr)*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::severity(e),
                    $(
                        $variant => $severity,
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    //! Unit tests for error handling functionality

    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CommonError::from(json_err);
        assert!(matches!(err, CommonError::Serialization { format: Some(ref f), .. } if f == "JSON"));
        assert!(err.to_string().starts_with("Serialization error (JSON)"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CommonError::from(io_err);
        assert_eq!(err, CommonError::persistence("denied"));
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
