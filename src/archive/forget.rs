//! Soft deletion.
//!
//! Nothing is ever removed from the entry log: deleting an entry only sets its
//! `hidden` flag, the same flag a revision sets on the row it supersedes.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::error::{ArchiveError, Result};

/// Hide an entry without creating a replacement.
///
/// Idempotent: returns `true` if this call hid the entry, `false` if it was
/// already hidden. Fails with [`ArchiveError::IdNotFound`] for unknown ids.
pub fn delete_entry(conn: &mut Connection, id: i64) -> Result<bool> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exists = tx
        .query_row("SELECT 1 FROM entries WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Err(ArchiveError::IdNotFound(id));
    }

    let hidden = hide(&tx, id, None)?;
    tx.commit()?;

    tracing::info!(id, hidden, "entry deleted");
    Ok(hidden)
}

/// Set the hidden flag (and optional successor) on a visible entry.
pub(crate) fn hide(conn: &Connection, id: i64, superseded_by: Option<i64>) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE entries SET hidden = 1, superseded_by = COALESCE(?1, superseded_by) \
         WHERE id = ?2 AND hidden = 0",
        params![superseded_by, id],
    )?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::search::get_entry;
    use crate::archive::store::add_entry;
    use crate::archive::types::{NewEntry, Visibility};
    use crate::db;

    fn insert(conn: &mut Connection) -> i64 {
        let new = NewEntry {
            link: Some("https://example.com".into()),
            ..Default::default()
        };
        add_entry(conn, &new).unwrap()
    }

    #[test]
    fn test_delete_hides_entry() {
        let mut conn = db::open_memory_database().unwrap();
        let id = insert(&mut conn);

        assert!(delete_entry(&mut conn, id).unwrap());
        assert!(get_entry(&conn, id, Visibility::Visible).unwrap().is_none());

        // Still in the log
        let entry = get_entry(&conn, id, Visibility::IncludeHidden).unwrap().unwrap();
        assert!(entry.hidden);
        assert_eq!(entry.superseded_by, None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut conn = db::open_memory_database().unwrap();
        let id = insert(&mut conn);

        assert!(delete_entry(&mut conn, id).unwrap());
        assert!(!delete_entry(&mut conn, id).unwrap());

        let hidden: i64 = conn
            .query_row("SELECT hidden FROM entries WHERE id = ?1", params![id], |row| row.get(0))
            .unwrap();
        assert_eq!(hidden, 1);
    }

    #[test]
    fn test_delete_nonexistent_fails() {
        let mut conn = db::open_memory_database().unwrap();
        let result = delete_entry(&mut conn, 99);
        assert!(matches!(result, Err(ArchiveError::IdNotFound(99))));
    }
}
