//! # Beacon Domain
//!
//! Business domain types for the Beacon platform client.
//!
//! This crate contains:
//! - Identity and credential types
//! - Telemetry event types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and input validation
//!
//! ## Architecture
//! - No dependencies on other Beacon crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
