//! Storage error types
//!
//! Defines error types for the storage layer, integrating with the common
//! error system.

use thiserror::Error;

use crate::error::{CommonError, ErrorSeverity};
use crate::{impl_error_classification, impl_error_conversion};

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file exists but does not hold the expected document.
    #[error("Stored data at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl_error_conversion!(StorageError, Common);

impl_error_classification!(StorageError, Common,
    Self::Corrupt { .. } => ErrorSeverity::Critical,
);
