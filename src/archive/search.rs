use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use super::error::Result;
use super::tags::{Meta, TagPattern, Tags};
use super::types::{Entry, Field, FileRef, NoteBlock, PageRow, StoredFile, Visibility};

// ── Public types ──────────────────────────────────────────────────────────────

/// Predicates for `find`. Every predicate that is set must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindQuery {
    /// Matches name, link, file name or any note text.
    pub keyword: Option<String>,
    pub tags: TagPattern,
    pub link: Option<String>,
    pub name: Option<String>,
}

impl FindQuery {
    pub fn matches(&self, entry: &Entry) -> bool {
        if !self.tags.matches(&entry.tags, &entry.meta) {
            return false;
        }
        if let Some(ref link) = self.link {
            if !entry.link.as_deref().is_some_and(|l| contains_ci(l, link)) {
                return false;
            }
        }
        if let Some(ref name) = self.name {
            if !entry.name.as_deref().is_some_and(|n| contains_ci(n, name)) {
                return false;
            }
        }
        if let Some(ref keyword) = self.keyword {
            if !entry.searchable_text().any(|text| contains_ci(text, keyword)) {
                return false;
            }
        }
        true
    }
}

// ── Internal row struct for fetched entries ───────────────────────────────────

const ENTRY_SELECT: &str = "SELECT e.id, e.name, e.created_at, e.revision, e.hidden, \
     e.superseded_by, e.tags, e.meta, e.link, e.file_id, f.name, f.size, e.notes_block \
     FROM entries e LEFT JOIN files f ON f.id = e.file_id";

struct EntryRow {
    id: i64,
    name: Option<String>,
    created_at: String,
    revision: i64,
    hidden: bool,
    superseded_by: Option<i64>,
    tags: String,
    meta: String,
    link: Option<String>,
    file: Option<FileRef>,
    notes_block: Option<i64>,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let file_id: Option<i64> = row.get(9)?;
        let file = match file_id {
            Some(id) => Some(FileRef {
                id,
                name: row.get(10)?,
                size: row.get(11)?,
            }),
            None => None,
        };
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            revision: row.get(3)?,
            hidden: row.get(4)?,
            superseded_by: row.get(5)?,
            tags: row.get(6)?,
            meta: row.get(7)?,
            link: row.get(8)?,
            file,
            notes_block: row.get(12)?,
        })
    }

    fn hydrate(self, conn: &Connection) -> Result<Entry> {
        let tags: Tags = serde_json::from_str(&self.tags)?;
        let meta: Meta = serde_json::from_str(&self.meta)?;
        let notes = self
            .notes_block
            .map(|block_id| load_notes(conn, block_id))
            .transpose()?;

        Ok(Entry {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            revision: self.revision,
            hidden: self.hidden,
            superseded_by: self.superseded_by,
            tags,
            meta,
            link: self.link,
            file: self.file,
            notes,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Fetch one entry by id. Hidden entries are only returned with
/// [`Visibility::IncludeHidden`].
pub fn get_entry(conn: &Connection, id: i64, visibility: Visibility) -> Result<Option<Entry>> {
    let Some(entry) = load_entry(conn, id)? else {
        return Ok(None);
    };
    if entry.hidden && visibility == Visibility::Visible {
        return Ok(None);
    }
    Ok(Some(entry))
}

/// Fetch one entry projected onto `fields`; `None` when nothing matches.
pub fn get(
    conn: &Connection,
    id: i64,
    fields: &[Field],
    visibility: Visibility,
) -> Result<Option<Vec<Value>>> {
    Ok(get_entry(conn, id, visibility)?.map(|entry| entry.project(fields)))
}

/// Scan visible entries, newest first, keep those matching `query`, and cut
/// out page `page` (1-based).
pub fn find_entries(
    conn: &Connection,
    query: &FindQuery,
    page: usize,
    page_size: usize,
) -> Result<Vec<PageRow<Entry>>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTRY_SELECT} WHERE e.hidden = 0 ORDER BY e.created_at DESC, e.id DESC"
    ))?;
    let rows = stmt
        .query_map([], EntryRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut matched = Vec::new();
    for row in rows {
        let entry = row.hydrate(conn)?;
        if query.matches(&entry) {
            matched.push(entry);
        }
    }

    tracing::debug!(matched = matched.len(), page, "find scanned entries");
    Ok(paginate(matched, page, page_size))
}

/// [`find_entries`] projected onto `fields`.
pub fn find(
    conn: &Connection,
    query: &FindQuery,
    fields: &[Field],
    page: usize,
    page_size: usize,
) -> Result<Vec<PageRow<Vec<Value>>>> {
    Ok(find_entries(conn, query, page, page_size)?
        .into_iter()
        .map(|row| row.map(|entry| entry.project(fields)))
        .collect())
}

/// Cut page `page` (1-based) out of `items`.
///
/// A page other than the first starts with an ellipsis row; a page with rows
/// left after it ends with one.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<PageRow<T>> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let start = (page - 1).saturating_mul(page_size);
    let more = items.len() > start.saturating_add(page_size);

    let mut rows = Vec::with_capacity(page_size + 2);
    if page > 1 {
        rows.push(PageRow::Ellipsis);
    }
    rows.extend(
        items
            .into_iter()
            .skip(start)
            .take(page_size)
            .map(PageRow::Item),
    );
    if more {
        rows.push(PageRow::Ellipsis);
    }
    rows
}

/// Fetch a stored blob with its content.
pub fn read_file(conn: &Connection, file_id: i64) -> Result<Option<StoredFile>> {
    let file = conn
        .query_row(
            "SELECT id, name, size, content, created_at FROM files WHERE id = ?1",
            params![file_id],
            |row| {
                Ok(StoredFile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    size: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(file)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Fetch an entry regardless of visibility.
pub(crate) fn load_entry(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    let row = conn
        .query_row(
            &format!("{ENTRY_SELECT} WHERE e.id = ?1"),
            params![id],
            EntryRow::from_row,
        )
        .optional()?;
    row.map(|row| row.hydrate(conn)).transpose()
}

fn load_notes(conn: &Connection, block_id: i64) -> Result<NoteBlock> {
    let mut stmt =
        conn.prepare_cached("SELECT body FROM notes WHERE block_id = ?1 ORDER BY position")?;
    let notes = stmt
        .query_map(params![block_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(NoteBlock { block_id, notes })
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
