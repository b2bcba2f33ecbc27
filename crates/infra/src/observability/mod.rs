//! Observability infrastructure
//!
//! Structured logging through `tracing`. Everything in the workspace logs
//! with `tracing` macros; this module installs the subscriber that renders
//! them.

pub mod logging;

pub use logging::{build_filter, init_tracing};
