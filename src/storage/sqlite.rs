//! SQLite archive implementation

use crate::site::PostRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArchiveWriter, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQLite archive backend
///
/// Posts are keyed by `(board, no)`; archiving a post that is already
/// stored is a no-op.
pub struct SqliteArchive {
    conn: Connection,
    path: PathBuf,
}

impl SqliteArchive {
    /// Opens or creates the archive database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteArchive)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Counts archived posts
    pub fn count_posts(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Loads every post of a thread in insertion order
    pub fn thread_posts(&self, board: &str, thread: &str) -> StorageResult<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT board, no, thread, timestamp, name, trip, subject, body, filename
             FROM posts WHERE board = ?1 AND thread = ?2 ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![board, thread], |row| {
            Ok(PostRecord {
                board: row.get(0)?,
                no: row.get(1)?,
                thread: row.get(2)?,
                timestamp: row.get(3)?,
                name: row.get(4)?,
                trip: row.get(5)?,
                subject: row.get(6)?,
                body: row.get(7)?,
                filename: row.get(8)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl ArchiveWriter for SqliteArchive {
    fn archive(&mut self, records: &[PostRecord]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO posts
                 (board, no, thread, timestamp, name, trip, subject, body, filename, archived_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for record in records {
                written += stmt.execute(params![
                    record.board,
                    record.no,
                    record.thread,
                    record.timestamp,
                    record.name,
                    record.trip,
                    record.subject,
                    record.body,
                    record.filename,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
