//! Integration tests for `beacon_common::error`.
//!
//! These suites validate severity delegation so adapters built on
//! `CommonError` are logged at consistent levels.

#![cfg(feature = "foundation")]

use beacon_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use beacon_common::{impl_error_classification, impl_error_conversion};
use thiserror::Error;

#[derive(Debug, Error)]
enum UploadError {
    #[error("Batch rejected: {0}")]
    Rejected(String),

    #[error("Backend busy")]
    Busy,

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_conversion!(UploadError, Common);

impl_error_classification!(UploadError, Common,
    Self::Rejected(_) => ErrorSeverity::Critical,
    Self::Busy => ErrorSeverity::Warning,
);

/// Validates that module errors delegate embedded common errors and apply
/// their own severity to module-specific variants.
#[test]
fn module_error_delegates_to_common() {
    assert_eq!(UploadError::Rejected("stale".into()).severity(), ErrorSeverity::Critical);
    assert_eq!(UploadError::Busy.severity(), ErrorSeverity::Warning);

    let io: UploadError = std::io::Error::new(std::io::ErrorKind::Other, "eio").into();
    assert!(matches!(io, UploadError::Common(CommonError::Persistence { .. })));
    assert_eq!(io.severity(), ErrorSeverity::Error);

    let json: UploadError = serde_json::from_str::<serde_json::Value>("[").unwrap_err().into();
    assert!(matches!(json, UploadError::Common(CommonError::Serialization { .. })));
    assert!(json.to_string().starts_with("Serialization error (JSON)"));
}

