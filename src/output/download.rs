//! Attachment downloads
//!
//! Files are streamed into a temporary file inside the output directory and
//! then linked into place without overwriting anything. When the name is
//! taken, `(Copy) ` is prepended until a free name is found.

use crate::output::DispatchError;
use crate::site::{sanitize_filename, Attachment};
use futures::StreamExt;
use reqwest::Client;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Prefix added to a filename that already exists
pub const COLLISION_PREFIX: &str = "(Copy) ";

/// Downloads attachments into one directory
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    dir: PathBuf,
    concurrency: usize,
}

impl Downloader {
    /// Creates a downloader
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `dir` - Writable output directory
    /// * `concurrency` - Downloads in flight per batch (0 = all at once)
    pub fn new(client: Client, dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            client,
            dir: dir.into(),
            concurrency,
        }
    }

    /// Fetches one attachment and stores it under a free name
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Where the file was written
    /// * `Err(DispatchError)` - The fetch or the write failed
    pub async fn download(&self, attachment: &Attachment) -> Result<PathBuf, DispatchError> {
        let name = local_name(attachment)
            .ok_or_else(|| DispatchError::InvalidName(attachment.url.to_string()))?;

        let response = self
            .client
            .get(attachment.url.clone())
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let path = self.store(&name, &bytes)?;
        tracing::debug!(url = %attachment.url, path = %path.display(), bytes = bytes.len(), "Downloaded file");
        Ok(path)
    }

    /// Downloads a batch of attachments, `concurrency` at a time
    ///
    /// Results come back in completion order.
    pub async fn download_all(
        &self,
        attachments: &[Attachment],
    ) -> Vec<(Attachment, Result<PathBuf, DispatchError>)> {
        let limit = match self.concurrency {
            0 => attachments.len().max(1),
            n => n,
        };

        futures::stream::iter(attachments.iter().cloned())
            .map(|attachment| async move {
                let result = self.download(&attachment).await;
                (attachment, result)
            })
            .buffer_unordered(limit)
            .collect()
            .await
    }

    /// Writes bytes to `dir/name`, prefixing the name until it is free
    ///
    /// The name is reduced to a single path component first.
    fn store(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DispatchError> {
        let mut name = match sanitize_filename(name) {
            safe if safe.is_empty() => return Err(DispatchError::InvalidName(name.to_string())),
            safe => safe,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;

        loop {
            let candidate = self.dir.join(&name);
            match tmp.persist_noclobber(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    tmp = e.file;
                    name = format!("{}{}", COLLISION_PREFIX, name);
                }
                Err(e) => {
                    return Err(DispatchError::Persist {
                        path: candidate,
                        source: e.error,
                    })
                }
            }
        }
    }
}

/// Uploaded name when it survives sanitising, else the server's name
fn local_name(attachment: &Attachment) -> Option<String> {
    [&attachment.original_name, &attachment.server_name]
        .into_iter()
        .map(|name| sanitize_filename(name))
        .find(|name| !name.is_empty())
}
