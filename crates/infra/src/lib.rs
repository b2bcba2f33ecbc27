//! # Beacon Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Configuration loading (environment, JSON, TOML)
//! - The reqwest HTTP transport
//! - Keychain and file credential stores
//! - The file-backed event queue mirror and its flush scheduler
//! - Tracing subscriber setup
//! - The [`PlatformSession`] façade wiring everything together
//!
//! ## Architecture
//! - Implements traits defined in `beacon-core`
//! - Depends on `beacon-common`, `beacon-domain` and `beacon-core`
//! - Contains all "impure" code (network, keychain, filesystem)

pub mod config;
pub mod credentials;
pub mod device;
pub mod errors;
pub mod events;
pub mod http;
pub mod observability;
pub mod scheduling;
pub mod session;

// Re-export commonly used items
pub use credentials::{FileCredentialStore, KeychainCredentialStore};
pub use device::{HostDeviceInfo, NoLocation};
pub use errors::InfraError;
pub use events::FileEventStorage;
pub use http::ReqwestTransport;
pub use observability::init_tracing;
pub use scheduling::EventFlushScheduler;
pub use session::{PlatformSession, PlatformSessionBuilder};
