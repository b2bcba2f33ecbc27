//! Local file persistence
//!
//! This module provides crash-safe JSON snapshots on disk. Writers replace a
//! file's contents atomically so a reader never observes a half-written
//! document, even if the process dies mid-write.

pub mod error;
pub mod json_file;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use json_file::JsonFileStore;
