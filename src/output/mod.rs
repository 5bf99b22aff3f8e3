//! Output module for delivering polled posts
//!
//! This module handles:
//! - Resolving and validating the output path
//! - Downloading attachments with collision-safe naming
//! - Handing posts to the archive writers
//! - Recording run statistics

mod download;
mod path;
pub mod stats;

pub use download::{Downloader, COLLISION_PREFIX};
pub use path::resolve_output_path;
pub use stats::{print_statistics, PollStatistics};

use crate::site::{Post, SiteAdapter};
use crate::storage::{ArchiveWriter, StorageError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while delivering posts
///
/// These never remove a target from the registry; the affected posts are
/// lost for this cycle.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Storage(#[from] StorageError),

    #[error("No usable filename for {0}")]
    InvalidName(String),
}

/// What one dispatch call delivered
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Posts written to the archive
    pub archived: usize,
    /// Attachments written to disk
    pub downloaded: usize,
    pub errors: Vec<DispatchError>,
}

/// Destination of the posts that survive dedup and filtering
pub enum Sink {
    /// Download every attachment
    Download(Downloader),
    /// Archive every post
    Archive(Box<dyn ArchiveWriter>),
    /// Discard everything
    Discard,
}

impl Sink {
    /// Delivers one thread's surviving posts
    ///
    /// # Arguments
    ///
    /// * `site` - Adapter that produced the posts
    /// * `board` - Board the posts belong to
    /// * `posts` - Posts in thread order
    pub async fn dispatch(
        &mut self,
        site: &dyn SiteAdapter,
        board: &str,
        posts: &[Post],
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        if posts.is_empty() {
            return report;
        }

        match self {
            Self::Download(downloader) => {
                let attachments: Vec<_> = posts
                    .iter()
                    .flat_map(|post| site.extract_attachments(post, board))
                    .collect();

                for (attachment, result) in downloader.download_all(&attachments).await {
                    match result {
                        Ok(path) => {
                            report.downloaded += 1;
                            tracing::info!(file = %path.display(), "Saved {}", attachment.original_name);
                        }
                        Err(e) => {
                            tracing::error!(url = %attachment.url, error = %e, "Download failed");
                            report.errors.push(e);
                        }
                    }
                }
            }
            Self::Archive(writer) => {
                let records: Vec<_> = posts.iter().map(|post| site.record(post, board)).collect();
                match writer.archive(&records) {
                    Ok(written) => {
                        report.archived = written;
                        tracing::info!(
                            board = %board,
                            archive = %writer.path().display(),
                            "Archived {} post(s)",
                            written
                        );
                    }
                    Err(e) => {
                        tracing::error!(board = %board, error = %e, "Archive write failed");
                        report.errors.push(e.into());
                    }
                }
            }
            Self::Discard => {}
        }

        report
    }
}
