//! Forward-only schema migration framework.
//!
//! Tracks the schema version in SQLite's `user_version` pragma and runs
//! sequential migrations to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use rusqlite::{params, Connection};

use crate::archive::tags::extract_named_tags;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.pragma_update(None, "user_version", version)
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        conn.execute_batch("BEGIN IMMEDIATE")?;
        let applied = match next {
            2 => migrate_v1_to_v2(conn),
            _ => {
                tracing::error!(version = next, "unknown migration target");
                conn.execute_batch("ROLLBACK")?;
                break;
            }
        }
        .and_then(|()| update_schema_version(conn, next));

        match applied {
            Ok(()) => conn.execute_batch("COMMIT")?,
            Err(e) => {
                conn.execute_batch("ROLLBACK")?;
                return Err(e);
            }
        }
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: give metadata its own `meta` column.
///
/// Earlier databases kept `key:value` strings inside the tag list; they are
/// moved into the JSON object so the tag column only holds plain tags.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("ALTER TABLE entries ADD COLUMN meta TEXT NOT NULL DEFAULT '{}'")?;

    let rows: Vec<(i64, String)> = conn
        .prepare("SELECT id, tags FROM entries")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    for (id, tags_json) in rows {
        let tags: Vec<String> = match serde_json::from_str(&tags_json) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!(id, error = %e, "unreadable tags column, leaving row as is");
                continue;
            }
        };
        let (plain, named) = extract_named_tags(tags);
        if named.is_empty() {
            continue;
        }

        // Last value wins when a legacy row carried several for one key
        let meta: serde_json::Map<String, serde_json::Value> = named
            .into_iter()
            .filter_map(|(key, mut values)| values.pop().map(|v| (key, v.into())))
            .collect();

        let plain: Vec<String> = plain.into_iter().collect();
        conn.execute(
            "UPDATE entries SET tags = ?1, meta = ?2 WHERE id = ?3",
            params![
                serde_json::to_string(&plain).unwrap_or_else(|_| "[]".into()),
                serde_json::Value::Object(meta).to_string(),
                id
            ],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn get_schema_version_returns_1_on_fresh_db() {
        let conn = test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn run_migrations_upgrades_to_current() {
        let conn = test_db();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_db();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap(); // second call should not error
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migration_v1_to_v2_moves_named_tags_into_meta() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO entries (link, tags, created_at) VALUES (?1, ?2, ?3)",
            params![
                "https://example.com",
                r#"["rust", "added_by:ana", "read:bob"]"#,
                "2024-01-01T00:00:00Z"
            ],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let (tags, meta): (String, String) = conn
            .query_row("SELECT tags, meta FROM entries WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        let tags: Vec<String> = serde_json::from_str(&tags).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();

        assert_eq!(tags, vec!["rust".to_string()]);
        assert_eq!(meta["added_by"], "ana");
        assert_eq!(meta["read"], "bob");
    }

    #[test]
    fn migration_v1_to_v2_skips_unreadable_tags() {
        let conn = test_db();
        for (link, tags) in [("https://a.com", "not json"), ("https://b.com", r#"["x", "k:v"]"#)] {
            conn.execute(
                "INSERT INTO entries (link, tags, created_at) VALUES (?1, ?2, ?3)",
                params![link, tags, "2024-01-01T00:00:00Z"],
            )
            .unwrap();
        }

        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

        let rows: Vec<(String, String)> = conn
            .prepare("SELECT tags, meta FROM entries ORDER BY id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        // The broken cell is untouched, the next row still migrates
        assert_eq!(rows[0], ("not json".to_string(), "{}".to_string()));
        assert_eq!(rows[1].0, r#"["x"]"#);
        assert_eq!(rows[1].1, r#"{"k":"v"}"#);
    }
}
