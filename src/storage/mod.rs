//! Storage module for archiving posts
//!
//! This module handles everything written in archive mode:
//! - Plaintext archives with replies grouped under their thread
//! - SQLite archives keyed by board and post number
//! - The 80-column record format shared by the plaintext writer

mod format;
mod plaintext;
mod schema;
mod sqlite;
mod traits;

pub use format::{format_record, format_timestamp};
pub use plaintext::PlaintextArchive;
pub use sqlite::SqliteArchive;
pub use traits::{ArchiveWriter, StorageError, StorageResult};

use crate::config::OutputFormat;
use std::path::Path;

/// Opens the archive writer for a format
///
/// # Arguments
///
/// * `format` - Archive format chosen on the command line
/// * `path` - Archive file, already resolved from the output option
///
/// # Returns
///
/// * `Ok(Box<dyn ArchiveWriter>)` - Writer ready for the first batch
/// * `Err(StorageError)` - The database could not be opened
pub fn open_archive(format: OutputFormat, path: &Path) -> StorageResult<Box<dyn ArchiveWriter>> {
    tracing::debug!(path = %path.display(), format = ?format, "Opening archive");
    let writer: Box<dyn ArchiveWriter> = match format {
        OutputFormat::Plaintext => Box::new(PlaintextArchive::new(path)),
        OutputFormat::Sqlite => Box::new(SqliteArchive::open(path)?),
    };
    Ok(writer)
}
