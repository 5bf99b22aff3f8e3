//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite archive.

/// SQL schema for the archive database
pub const SCHEMA_SQL: &str = r#"
-- One row per archived post
CREATE TABLE IF NOT EXISTS posts (
    board TEXT NOT NULL,
    no TEXT NOT NULL,
    thread TEXT NOT NULL,
    timestamp INTEGER,
    name TEXT NOT NULL DEFAULT '',
    trip TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL DEFAULT '',
    filename TEXT,
    archived_at TEXT NOT NULL,
    PRIMARY KEY (board, no)
);

CREATE INDEX IF NOT EXISTS idx_posts_thread ON posts(board, thread);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
