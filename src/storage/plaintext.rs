//! Plaintext archive implementation
//!
//! The archive is a flat text file of formatted records. Replies are
//! inserted directly after the last record already stored for their thread,
//! so each thread reads top to bottom. Every batch rewrites the whole file
//! through a temporary file in the same directory, so an interrupted write
//! leaves the previous archive intact.

use crate::site::PostRecord;
use crate::storage::format::{format_record, rule, POST_PREFIX, THREAD_PREFIX};
use crate::storage::traits::{ArchiveWriter, StorageError, StorageResult};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Identity of a record as found in the archive file
#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordKey {
    board: String,
    no: String,
    thread: String,
}

impl RecordKey {
    /// Reads the `Post ID` and `Thread` lines following the opening rule
    fn parse(header: &[&str]) -> Option<Self> {
        let no = header.first()?.trim_end().strip_prefix(POST_PREFIX)?;
        let location = header.get(1)?.trim_end().strip_prefix(THREAD_PREFIX)?;
        let (board, thread) = location.trim_matches('/').split_once('/')?;
        Some(Self {
            board: board.to_string(),
            no: no.to_string(),
            thread: thread.to_string(),
        })
    }
}

/// A chunk of the archive starting at a record boundary
///
/// Chunks whose header cannot be read keep no key and are written back
/// untouched.
#[derive(Debug, Clone)]
struct StoredRecord {
    key: Option<RecordKey>,
    text: String,
}

/// Archive contents split into records
#[derive(Debug, Default)]
struct ArchiveContents {
    /// Anything before the first record, kept verbatim
    preamble: String,
    records: Vec<StoredRecord>,
}

impl ArchiveContents {
    fn parse(content: &str) -> Self {
        let rule = rule();
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        // A hand-edited file may have text glued to the front of a rule
        let starts: Vec<usize> = (0..lines.len())
            .filter(|&i| {
                lines[i].trim_end().ends_with(rule.as_str())
                    && lines.get(i + 1).is_some_and(|next| next.starts_with(POST_PREFIX))
            })
            .collect();

        let Some(&first) = starts.first() else {
            return Self {
                preamble: content.to_string(),
                records: Vec::new(),
            };
        };

        let mut contents = Self {
            preamble: lines[..first].concat(),
            records: Vec::new(),
        };

        for (n, &start) in starts.iter().enumerate() {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            let opening = lines[start].trim_end();
            let lead = &opening[..opening.len() - rule.len()];
            if !lead.is_empty() {
                let previous = match contents.records.last_mut() {
                    Some(record) => &mut record.text,
                    None => &mut contents.preamble,
                };
                previous.push_str(lead);
                previous.push('\n');
            }

            let rest = &lines[start + 1..end];
            let text = format!("{}\n{}", rule, rest.concat());
            contents.records.push(StoredRecord {
                key: RecordKey::parse(rest),
                text: format!("{}\n", text.trim_end_matches('\n')),
            });
        }
        contents
    }

    fn render(&self) -> String {
        let body = self
            .records
            .iter()
            .map(|record| record.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut out = self.preamble.clone();
        if !out.is_empty() && !out.ends_with('\n') && !body.is_empty() {
            out.push('\n');
        }
        out.push_str(&body);
        out
    }

    fn known(&self) -> HashSet<(String, String)> {
        self.records
            .iter()
            .filter_map(|r| r.key.as_ref())
            .map(|key| (key.board.clone(), key.no.clone()))
            .collect()
    }

    /// Inserts a record after the last one of its thread; false if already present
    fn insert(&mut self, record: &PostRecord, known: &mut HashSet<(String, String)>) -> bool {
        if !known.insert((record.board.clone(), record.no.clone())) {
            return false;
        }

        let stored = StoredRecord {
            key: Some(RecordKey {
                board: record.board.clone(),
                no: record.no.clone(),
                thread: record.thread.clone(),
            }),
            text: format_record(record),
        };

        match self.records.iter().rposition(|r| {
            r.key
                .as_ref()
                .is_some_and(|key| key.board == record.board && key.thread == record.thread)
        }) {
            Some(last) => self.records.insert(last + 1, stored),
            None => self.records.push(stored),
        }
        true
    }
}

/// Flat text archive backend
pub struct PlaintextArchive {
    path: PathBuf,
}

impl PlaintextArchive {
    /// Creates a writer for the given archive file
    ///
    /// The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_existing(&self) -> StorageResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn directory(&self) -> StorageResult<&Path> {
        match self.path.parent() {
            Some(dir) if dir.as_os_str().is_empty() => Ok(Path::new(".")),
            Some(dir) => Ok(dir),
            None => Err(StorageError::NoParent(self.path.clone())),
        }
    }

    fn replace(&self, content: &str) -> StorageResult<()> {
        let mut tmp = NamedTempFile::new_in(self.directory()?)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&self.path).map_err(|e| StorageError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

impl ArchiveWriter for PlaintextArchive {
    fn archive(&mut self, records: &[PostRecord]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut contents = ArchiveContents::parse(&self.read_existing()?);
        let mut known = contents.known();

        let written = records
            .iter()
            .filter(|record| contents.insert(record, &mut known))
            .count();

        if written > 0 {
            self.replace(&contents.render())?;
        }
        Ok(written)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
