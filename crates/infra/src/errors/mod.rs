//! Infrastructure error handling
//!
//! Adapters report failures as [`InfraError`], which wraps the domain error
//! so callers only ever see [`beacon_domain::BeaconError`].

pub mod conversions;

pub use conversions::{InfraError, IntoTransportError};

/// Result alias for adapter internals.
pub type InfraResult<T> = Result<T, InfraError>;
