//! Platform secret storage
//!
//! This module wraps the operating system keychain (macOS Keychain Access,
//! Windows Credential Manager, Linux Secret Service) behind the
//! [`SecretStore`] trait so adapters can be exercised against an in-memory
//! store in tests.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider, SecretStore};
