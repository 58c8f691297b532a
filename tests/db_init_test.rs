use arquive::db;

fn names(conn: &rusqlite::Connection, kind: &str) -> Vec<String> {
    conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
        .unwrap()
        .query_map([kind], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn full_schema_creates_all_tables_and_indexes() {
    let conn = db::open_memory_database().unwrap();

    let tables = names(&conn, "table");
    for expected in ["entries", "files", "notes"] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }

    let indexes = names(&conn, "index");
    for expected in ["idx_entries_created", "idx_entries_hidden", "idx_notes_block"] {
        assert!(indexes.iter().any(|i| i == expected), "missing index {expected}");
    }
}

#[test]
fn entries_carry_meta_column_after_migration() {
    let conn = db::open_memory_database().unwrap();

    let columns: Vec<String> = conn
        .prepare("SELECT name FROM pragma_table_info('entries')")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    for expected in ["id", "name", "link", "file_id", "notes_block", "tags", "meta", "revision", "hidden", "superseded_by", "created_at"] {
        assert!(columns.iter().any(|c| c == expected), "missing column {expected}");
    }
}

#[test]
fn file_reference_must_exist() {
    let conn = db::open_memory_database().unwrap();

    let result = conn.execute(
        "INSERT INTO entries (file_id, created_at) VALUES (99, '2024-01-01T00:00:00Z')",
        [],
    );
    assert!(result.is_err(), "foreign key on file_id should be enforced");
}
