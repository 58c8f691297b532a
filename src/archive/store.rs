//! Write path: link validation, blob and note storage, entry insertion and revision.
//!
//! Every public function here runs inside one `IMMEDIATE` transaction, so the
//! single-writer lock is taken before anything is read and a revision's insert
//! and hide commit together or not at all.

use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use super::error::{ArchiveError, Result};
use super::forget::hide;
use super::link::normalize_link;
use super::search::load_entry;
use super::tags::{Meta, Tags};
use super::types::{Entry, EntryDiff, NewEntry, NewFile};

/// Column values of a row about to be appended to `entries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryRecord {
    pub name: Option<String>,
    pub link: Option<String>,
    pub file_id: Option<i64>,
    pub notes_block: Option<i64>,
    pub tags: Tags,
    pub meta: Meta,
    pub revision: i64,
    pub created_at: String,
}

/// Newly stored blob and note block produced for a revision.
#[derive(Debug, Default)]
pub(crate) struct StoredParts {
    pub link: Option<String>,
    pub file_id: Option<i64>,
    /// `Some(None)` drops the old block.
    pub notes_block: Option<Option<i64>>,
}

/// Build the next revision of `old`: unspecified fields are copied forward,
/// tag and metadata diffs are applied to the old sets.
pub(crate) fn revise(old: &Entry, diff: &EntryDiff, parts: StoredParts) -> EntryRecord {
    EntryRecord {
        name: diff.name.clone().or_else(|| old.name.clone()),
        link: parts.link.or_else(|| old.link.clone()),
        file_id: parts.file_id.or(old.file.as_ref().map(|f| f.id)),
        notes_block: parts
            .notes_block
            .unwrap_or(old.notes.as_ref().map(|n| n.block_id)),
        tags: diff
            .tags
            .as_ref()
            .map_or_else(|| old.tags.clone(), |d| d.apply(&old.tags)),
        meta: diff.meta.apply(&old.meta),
        revision: old.revision + 1,
        created_at: old.created_at.clone(),
    }
}

/// Insert a brand-new entry. Returns its id.
pub fn add_entry(conn: &mut Connection, new: &NewEntry) -> Result<i64> {
    add_entry_replacing(conn, new, None)
}

/// Insert a brand-new entry and, in the same transaction, hide `retract`
/// (the entry generated by an earlier version of the same command).
pub fn add_entry_replacing(
    conn: &mut Connection,
    new: &NewEntry,
    retract: Option<i64>,
) -> Result<i64> {
    let link = new.link.as_deref().map(normalize_link).transpose()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Blob first so the entry can reference it
    let file_id = new
        .file
        .as_ref()
        .map(|file| insert_file(&tx, file))
        .transpose()?;
    let notes_block = insert_note_block(&tx, &new.notes)?;

    let id = insert_entry(
        &tx,
        &EntryRecord {
            name: new.name.clone(),
            link,
            file_id,
            notes_block,
            tags: new.tags.clone(),
            meta: new.meta.clone(),
            revision: 0,
            created_at: now(),
        },
    )?;

    if let Some(old) = retract {
        let retracted = hide(&tx, old, None)?;
        debug!(id = old, retracted, "retracted previously generated entry");
    }

    tx.commit()?;

    info!(id, file = ?file_id, notes = ?notes_block, "entry added");
    Ok(id)
}

/// Revise a visible entry: insert the new revision and hide the old one.
/// Returns the new id.
pub fn update_entry(conn: &mut Connection, id: i64, diff: &EntryDiff) -> Result<i64> {
    revise_entry(conn, id, diff, None)
}

/// Redo an update whose earlier result was `previous`.
///
/// When `previous` is the live revision that superseded `id`, it is hidden
/// and the new revision is built from `id` again, so the logical record keeps
/// exactly one live revision. Otherwise this is a plain [`update_entry`].
pub fn amend_update(
    conn: &mut Connection,
    id: i64,
    diff: &EntryDiff,
    previous: i64,
) -> Result<i64> {
    revise_entry(conn, id, diff, Some(previous))
}

fn revise_entry(
    conn: &mut Connection,
    id: i64,
    diff: &EntryDiff,
    previous: Option<i64>,
) -> Result<i64> {
    let link = diff.link.as_deref().map(normalize_link).transpose()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let old = load_entry(&tx, id)?.ok_or(ArchiveError::IdNotFound(id))?;

    let replacing = match previous {
        Some(p) if old.superseded_by == Some(p) => load_entry(&tx, p)?
            .filter(|prev| !prev.hidden)
            .map(|prev| prev.id),
        _ => None,
    };
    if old.hidden && replacing.is_none() {
        return Err(ArchiveError::IdNotFound(id));
    }
    if let Some(p) = replacing {
        hide(&tx, p, None)?;
    }

    let parts = StoredParts {
        link,
        file_id: diff
            .file
            .as_ref()
            .map(|file| insert_file(&tx, file))
            .transpose()?,
        notes_block: diff
            .notes
            .as_ref()
            .map(|notes| insert_note_block(&tx, notes))
            .transpose()?,
    };

    let record = revise(&old, diff, parts);
    let new_id = insert_entry(&tx, &record)?;

    tx.execute(
        "UPDATE entries SET hidden = 1, superseded_by = ?1 WHERE id = ?2",
        params![new_id, id],
    )?;

    tx.commit()?;

    info!(old = id, new = new_id, revision = record.revision, replaced = ?replacing, "entry revised");
    Ok(new_id)
}

fn insert_file(tx: &Transaction, file: &NewFile) -> Result<i64> {
    tx.execute(
        "INSERT INTO files (name, size, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![file.name, file.content.len() as i64, file.content, now()],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Allocate the next block id and store `notes` under it. `None` for no notes.
fn insert_note_block(tx: &Transaction, notes: &[String]) -> Result<Option<i64>> {
    if notes.is_empty() {
        return Ok(None);
    }

    // Notes are never deleted, so MAX + 1 never hands out a used id
    let block_id: i64 = tx.query_row(
        "SELECT COALESCE(MAX(block_id), 0) + 1 FROM notes",
        [],
        |row| row.get(0),
    )?;

    let created_at = now();
    for (position, body) in notes.iter().enumerate() {
        tx.execute(
            "INSERT INTO notes (block_id, position, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![block_id, position as i64, body, created_at],
        )?;
    }

    Ok(Some(block_id))
}

fn insert_entry(tx: &Transaction, record: &EntryRecord) -> Result<i64> {
    let tags: Vec<&String> = record.tags.iter().collect();
    tx.execute(
        "INSERT INTO entries (name, link, file_id, notes_block, tags, meta, revision, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.name,
            record.link,
            record.file_id,
            record.notes_block,
            serde_json::to_string(&tags)?,
            serde_json::to_string(&record.meta)?,
            record.revision,
            record.created_at,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Fixed-width UTC timestamp, so string order is time order.
fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::search::get_entry;
    use crate::archive::tags::{MetaDiff, TagDiff};
    use crate::archive::types::Visibility;
    use crate::db;

    fn test_db() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn tags(items: &[&str]) -> Tags {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_entry() -> NewEntry {
        NewEntry {
            name: Some("name".into()),
            link: Some("https://www.google.com/".into()),
            tags: tags(&["tag1", "tag2"]),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut conn = test_db();
        let id = add_entry(&mut conn, &sample_entry()).unwrap();
        assert_eq!(id, 1);

        let entry = get_entry(&conn, id, Visibility::Visible).unwrap().unwrap();
        assert_eq!(entry.link.as_deref(), Some("https://www.google.com/"));
        assert_eq!(entry.tags, tags(&["tag1", "tag2"]));
        assert_eq!(entry.name.as_deref(), Some("name"));
        assert_eq!(entry.revision, 0);
        assert!(!entry.hidden);
    }

    #[test]
    fn test_add_completes_bare_host() {
        let mut conn = test_db();
        let new = NewEntry {
            link: Some("example.com".into()),
            ..Default::default()
        };
        let id = add_entry(&mut conn, &new).unwrap();
        let entry = get_entry(&conn, id, Visibility::Visible).unwrap().unwrap();
        assert_eq!(entry.link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_broken_link_rejected_and_nothing_stored() {
        let mut conn = test_db();
        let new = NewEntry {
            link: Some("broken link".into()),
            ..Default::default()
        };
        assert!(matches!(
            add_entry(&mut conn, &new),
            Err(ArchiveError::InvalidLink(_))
        ));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_file_and_notes_stored() {
        let mut conn = test_db();
        let new = NewEntry {
            file: Some(NewFile {
                name: "filename.txt".into(),
                content: b"some content here".to_vec(),
            }),
            notes: vec!["first".into(), "second".into()],
            ..Default::default()
        };
        let id = add_entry(&mut conn, &new).unwrap();

        let entry = get_entry(&conn, id, Visibility::Visible).unwrap().unwrap();
        let file = entry.file.unwrap();
        assert_eq!(file.name, "filename.txt");
        assert_eq!(file.size, 17);
        let notes = entry.notes.unwrap();
        assert_eq!(notes.block_id, 1);
        assert_eq!(notes.notes, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_note_blocks_are_sequential() {
        let mut conn = test_db();
        let with_notes = |text: &str| NewEntry {
            notes: vec![text.to_string()],
            ..Default::default()
        };
        let a = add_entry(&mut conn, &with_notes("a")).unwrap();
        let b = add_entry(&mut conn, &with_notes("b")).unwrap();

        let block = |id| {
            get_entry(&conn, id, Visibility::Visible)
                .unwrap()
                .unwrap()
                .notes
                .unwrap()
                .block_id
        };
        assert_eq!(block(a), 1);
        assert_eq!(block(b), 2);
    }

    #[test]
    fn test_update_creates_revision_and_hides_old() {
        let mut conn = test_db();
        let id = add_entry(&mut conn, &sample_entry()).unwrap();

        let diff = EntryDiff {
            tags: Some(TagDiff::Replace(tags(&["new tag"]))),
            ..Default::default()
        };
        let new_id = update_entry(&mut conn, id, &diff).unwrap();
        assert_eq!(new_id, 2);

        let old = get_entry(&conn, id, Visibility::IncludeHidden).unwrap().unwrap();
        assert!(old.hidden);
        assert_eq!(old.superseded_by, Some(new_id));
        assert_eq!(old.tags, tags(&["tag1", "tag2"]));

        let new = get_entry(&conn, new_id, Visibility::Visible).unwrap().unwrap();
        assert_eq!(new.tags, tags(&["new tag"]));
        assert_eq!(new.link, old.link);
        assert_eq!(new.name, old.name);
        assert_eq!(new.revision, 1);
        assert_eq!(new.created_at, old.created_at);
    }

    #[test]
    fn test_update_hidden_entry_fails() {
        let mut conn = test_db();
        let id = add_entry(&mut conn, &sample_entry()).unwrap();
        update_entry(&mut conn, id, &EntryDiff::default()).unwrap();

        let result = update_entry(&mut conn, id, &EntryDiff::default());
        assert!(matches!(result, Err(ArchiveError::IdNotFound(i)) if i == id));
    }

    #[test]
    fn test_update_missing_entry_fails() {
        let mut conn = test_db();
        let result = update_entry(&mut conn, 42, &EntryDiff::default());
        assert!(matches!(result, Err(ArchiveError::IdNotFound(42))));
    }

    #[test]
    fn test_update_invalid_link_leaves_store_unchanged() {
        let mut conn = test_db();
        let id = add_entry(&mut conn, &sample_entry()).unwrap();
        let diff = EntryDiff {
            link: Some("not a link".into()),
            ..Default::default()
        };
        assert!(update_entry(&mut conn, id, &diff).is_err());

        let entry = get_entry(&conn, id, Visibility::Visible).unwrap();
        assert!(entry.is_some(), "old entry must stay visible");
    }

    #[test]
    fn test_update_applies_meta_diff() {
        let mut conn = test_db();
        let mut new = sample_entry();
        new.meta.insert("added_by".into(), "ana".into());
        let id = add_entry(&mut conn, &new).unwrap();

        let diff = EntryDiff {
            meta: MetaDiff {
                set: [("read".to_string(), "bob".to_string())].into(),
                unset: Meta::new(),
            },
            ..Default::default()
        };
        let new_id = update_entry(&mut conn, id, &diff).unwrap();
        let entry = get_entry(&conn, new_id, Visibility::Visible).unwrap().unwrap();
        assert_eq!(entry.meta["added_by"], "ana");
        assert_eq!(entry.meta["read"], "bob");
    }

    #[test]
    fn test_amend_update_keeps_one_live_revision() {
        let mut conn = test_db();
        let id = add_entry(&mut conn, &sample_entry()).unwrap();

        let first = EntryDiff {
            name: Some("typo".into()),
            ..Default::default()
        };
        let previous = update_entry(&mut conn, id, &first).unwrap();

        let second = EntryDiff {
            name: Some("fixed".into()),
            ..Default::default()
        };
        let redone = amend_update(&mut conn, id, &second, previous).unwrap();

        assert!(get_entry(&conn, previous, Visibility::Visible).unwrap().is_none());
        assert!(get_entry(&conn, id, Visibility::Visible).unwrap().is_none());
        let entry = get_entry(&conn, redone, Visibility::Visible).unwrap().unwrap();
        assert_eq!(entry.name.as_deref(), Some("fixed"));
        assert_eq!(entry.revision, 1);

        let live: i64 = conn
            .query_row("SELECT COUNT(*) FROM entries WHERE hidden = 0", [], |row| row.get(0))
            .unwrap();
        assert_eq!(live, 1);
    }

    #[test]
    fn test_add_replacing_hides_previous() {
        let mut conn = test_db();
        let first = add_entry(&mut conn, &sample_entry()).unwrap();
        let second = add_entry_replacing(&mut conn, &sample_entry(), Some(first)).unwrap();

        assert!(get_entry(&conn, first, Visibility::Visible).unwrap().is_none());
        assert!(get_entry(&conn, second, Visibility::Visible).unwrap().is_some());
    }

    #[test]
    fn test_revise_copies_forward() {
        let old = Entry {
            id: 3,
            name: Some("n".into()),
            created_at: "2024-01-01T00:00:00.000000Z".into(),
            revision: 2,
            hidden: false,
            superseded_by: None,
            tags: tags(&["a", "b"]),
            meta: Meta::new(),
            link: Some("https://a.io".into()),
            file: None,
            notes: None,
        };
        let diff = EntryDiff {
            tags: Some(TagDiff::Delta {
                add: tags(&["c", "d"]),
                sub: tags(&["a"]),
            }),
            ..Default::default()
        };
        let record = revise(&old, &diff, StoredParts::default());
        assert_eq!(record.tags, tags(&["b", "c", "d"]));
        assert_eq!(record.link.as_deref(), Some("https://a.io"));
        assert_eq!(record.revision, 3);
        assert_eq!(record.created_at, old.created_at);
    }
}
