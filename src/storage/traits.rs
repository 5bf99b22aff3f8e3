//! Storage traits and error types
//!
//! This module defines the trait interface for archive backends and
//! associated error types.

use crate::site::PostRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during archive operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive path {0} has no parent directory")]
    NoParent(PathBuf),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for archive backend implementations
///
/// Writers are handed the posts of one thread fetch at a time. Each call
/// must leave the archive either fully updated or untouched.
pub trait ArchiveWriter: Send {
    /// Stores every record not already archived
    ///
    /// # Arguments
    ///
    /// * `records` - Posts in thread order
    ///
    /// # Returns
    ///
    /// The number of records actually written
    fn archive(&mut self, records: &[PostRecord]) -> StorageResult<usize>;

    /// Location of the archive on disk
    fn path(&self) -> &Path;
}
