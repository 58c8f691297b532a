use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use super::error::Result;

/// Response from archive_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_entries: u64,
    pub visible_entries: u64,
    pub hidden_entries: u64,
    /// Visible entries that are a revision of something older.
    pub revised_entries: u64,
    pub files: u64,
    pub file_bytes: u64,
    pub note_blocks: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_entry: Option<String>,
}

/// Compute archive statistics.
///
/// `db_path` is used for file size calculation; pass None for in-memory databases.
pub fn archive_stats(conn: &Connection, db_path: Option<&Path>) -> Result<StatsResponse> {
    let (total, visible, revised) = count_entries(conn)?;
    let (files, file_bytes) = count_files(conn)?;
    let note_blocks: i64 =
        conn.query_row("SELECT COUNT(DISTINCT block_id) FROM notes", [], |row| row.get(0))?;
    let (oldest, newest) = entry_time_range(conn)?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        total_entries: total,
        visible_entries: visible,
        hidden_entries: total - visible,
        revised_entries: revised,
        files,
        file_bytes,
        note_blocks: note_blocks as u64,
        db_size_bytes,
        oldest_entry: oldest,
        newest_entry: newest,
    })
}

/// Total, visible, and visible-revised counts.
fn count_entries(conn: &Connection) -> Result<(u64, u64, u64)> {
    let (total, visible, revised): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*), \
                COALESCE(SUM(hidden = 0), 0), \
                COALESCE(SUM(hidden = 0 AND revision > 0), 0) \
         FROM entries",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    Ok((total as u64, visible as u64, revised as u64))
}

fn count_files(conn: &Connection) -> Result<(u64, u64)> {
    let (count, bytes): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM files",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((count as u64, bytes as u64))
}

/// Oldest and newest creation timestamps among visible entries.
fn entry_time_range(conn: &Connection) -> Result<(Option<String>, Option<String>)> {
    let range = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM entries WHERE hidden = 0",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::forget::delete_entry;
    use crate::archive::store::{add_entry, update_entry};
    use crate::archive::types::{EntryDiff, NewEntry, NewFile};
    use crate::db;

    fn link(url: &str) -> NewEntry {
        NewEntry {
            link: Some(url.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_db_stats() {
        let conn = db::open_memory_database().unwrap();
        let stats = archive_stats(&conn, None).unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.visible_entries, 0);
        assert_eq!(stats.hidden_entries, 0);
        assert_eq!(stats.files, 0);
        assert_eq!(stats.note_blocks, 0);
        assert!(stats.oldest_entry.is_none());
        assert!(stats.newest_entry.is_none());
    }

    #[test]
    fn test_stats_counts_revisions_and_deletes() {
        let mut conn = db::open_memory_database().unwrap();
        let a = add_entry(&mut conn, &link("a.com")).unwrap();
        let b = add_entry(&mut conn, &link("b.com")).unwrap();
        add_entry(
            &mut conn,
            &NewEntry {
                file: Some(NewFile {
                    name: "f.bin".into(),
                    content: vec![0; 64],
                }),
                notes: vec!["n".into()],
                ..Default::default()
            },
        )
        .unwrap();

        let diff = EntryDiff {
            name: Some("renamed".into()),
            ..Default::default()
        };
        update_entry(&mut conn, a, &diff).unwrap();
        delete_entry(&mut conn, b).unwrap();

        let stats = archive_stats(&conn, None).unwrap();
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.visible_entries, 2);
        assert_eq!(stats.hidden_entries, 2);
        assert_eq!(stats.revised_entries, 1);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.file_bytes, 64);
        assert_eq!(stats.note_blocks, 1);
        assert!(stats.oldest_entry.is_some());
    }
}
