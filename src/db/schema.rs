//! SQL DDL for all archive tables.
//!
//! Defines the append-only `entries` log, the `files` blob table and the
//! `notes` table (one row per note, grouped by `block_id`). All DDL uses
//! `IF NOT EXISTS` for idempotent initialization; later columns arrive through
//! [`super::migrations`].

use rusqlite::Connection;

/// Schema version written by [`init_schema`] on a fresh database.
pub const BASE_SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
-- Uploaded blobs. Never revised; re-adding a file inserts a new row.
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    content BLOB NOT NULL,
    created_at TEXT NOT NULL
);

-- Free-text notes. Rows sharing a block_id form one immutable block.
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_block ON notes(block_id);

-- Append-only entry log. A revision is a new row; the old one is hidden.
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    link TEXT,
    file_id INTEGER REFERENCES files(id),
    notes_block INTEGER,
    tags TEXT NOT NULL DEFAULT '[]',
    revision INTEGER NOT NULL DEFAULT 0,
    hidden INTEGER NOT NULL DEFAULT 0 CHECK(hidden IN (0, 1)),
    superseded_by INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_hidden ON entries(hidden);
CREATE INDEX IF NOT EXISTS idx_entries_created ON entries(created_at);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Stamp the base version on a brand-new database only
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version == 0 {
        conn.pragma_update(None, "user_version", BASE_SCHEMA_VERSION)?;
    }

    Ok(())
}
