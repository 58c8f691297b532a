//! Core archive type definitions.
//!
//! [`Entry`] is one immutable row of the entry log. [`NewEntry`] and
//! [`EntryDiff`] are the write requests for `add` and `update`; [`Field`]
//! names what a caller wants projected out of an entry.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use super::tags::{render_tags, Meta, MetaDiff, TagDiff, Tags};

/// Reference from an entry to its stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub id: i64,
    pub name: String,
    pub size: i64,
}

/// A stored blob, content included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: i64,
    pub name: String,
    pub size: i64,
    pub content: Vec<u8>,
    pub created_at: String,
}

/// An immutable group of notes sharing one allocation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteBlock {
    pub block_id: i64,
    pub notes: Vec<String>,
}

/// One archived record, matching a row of the `entries` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Monotonic row id, never reused.
    pub id: i64,
    pub name: Option<String>,
    /// RFC 3339 timestamp of the first revision; copied forward by updates.
    pub created_at: String,
    /// How many revisions preceded this one.
    pub revision: i64,
    pub hidden: bool,
    /// Id of the revision that replaced this one; `None` when live or deleted.
    pub superseded_by: Option<i64>,
    pub tags: Tags,
    pub meta: Meta,
    pub link: Option<String>,
    pub file: Option<FileRef>,
    pub notes: Option<NoteBlock>,
}

/// Uploaded file content attached to a command.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct NewFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// Everything needed to insert a brand-new entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub name: Option<String>,
    /// Raw link; validated and completed by the store.
    pub link: Option<String>,
    pub tags: Tags,
    pub meta: Meta,
    pub file: Option<NewFile>,
    /// Empty means no note block.
    pub notes: Vec<String>,
}

/// Fields a revision overrides. `None` copies the old value forward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDiff {
    pub name: Option<String>,
    pub link: Option<String>,
    pub tags: Option<TagDiff>,
    pub meta: MetaDiff,
    pub file: Option<NewFile>,
    /// `Some(vec![])` drops the note block.
    pub notes: Option<Vec<String>>,
}

impl EntryDiff {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.link.is_none()
            && self.tags.is_none()
            && self.meta.is_empty()
            && self.file.is_none()
            && self.notes.is_none()
    }
}

/// Whether hidden revisions may be returned by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    IncludeHidden,
}

/// A projectable column of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Id,
    Name,
    Tags,
    Link,
    File,
    Notes,
    Meta,
    CreatedAt,
    Revision,
    Hidden,
    /// Value of one metadata key, shown as its own column.
    MetaKey(String),
}

impl Field {
    /// Parse a column name; unknown names address a metadata key.
    pub fn parse(name: &str) -> Self {
        match name {
            "id" => Self::Id,
            "name" => Self::Name,
            "tags" => Self::Tags,
            "link" => Self::Link,
            "file" => Self::File,
            "notes" => Self::Notes,
            "meta" => Self::Meta,
            "created_at" => Self::CreatedAt,
            "revision" => Self::Revision,
            "hidden" => Self::Hidden,
            other => Self::MetaKey(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Tags => "tags",
            Self::Link => "link",
            Self::File => "file",
            Self::Notes => "notes",
            Self::Meta => "meta",
            Self::CreatedAt => "created_at",
            Self::Revision => "revision",
            Self::Hidden => "hidden",
            Self::MetaKey(key) => key,
        }
    }

    /// Columns returned by `get` when none are requested.
    pub fn entry_defaults() -> Vec<Field> {
        vec![
            Self::Id,
            Self::Name,
            Self::Tags,
            Self::Link,
            Self::File,
            Self::Notes,
        ]
    }

    /// Columns of a `find` table when none are requested.
    pub fn table_defaults() -> Vec<Field> {
        vec![Self::Id, Self::Name, Self::Link, Self::Tags]
    }

    /// Columns echoed back after `add` and `update`.
    pub fn resume() -> Vec<Field> {
        vec![Self::Id, Self::Name, Self::Tags]
    }
}

impl Entry {
    pub fn value_of(&self, field: &Field) -> Value {
        match field {
            Field::Id => json!(self.id),
            Field::Name => json!(self.name),
            Field::Tags => json!(render_tags(&self.tags, &self.meta)),
            Field::Link => json!(self.link),
            Field::File => json!(self.file),
            Field::Notes => json!(self.notes.as_ref().map(|block| &block.notes)),
            Field::Meta => json!(self.meta),
            Field::CreatedAt => json!(self.created_at),
            Field::Revision => json!(self.revision),
            Field::Hidden => json!(self.hidden),
            Field::MetaKey(key) => json!(self.meta.get(key)),
        }
    }

    /// Project onto `fields`, in order.
    pub fn project(&self, fields: &[Field]) -> Vec<Value> {
        fields.iter().map(|f| self.value_of(f)).collect()
    }

    /// Note texts plus name, link and file name: everything a keyword searches.
    pub(crate) fn searchable_text(&self) -> impl Iterator<Item = &str> {
        self.name
            .as_deref()
            .into_iter()
            .chain(self.link.as_deref())
            .chain(self.file.as_ref().map(|f| f.name.as_str()))
            .chain(
                self.notes
                    .iter()
                    .flat_map(|block| block.notes.iter().map(String::as_str)),
            )
    }
}

/// One row of a paginated result.
#[derive(Debug, Clone, PartialEq)]
pub enum PageRow<T> {
    /// Rows were skipped before, or remain after, this point.
    Ellipsis,
    Item(T),
}

impl<T> PageRow<T> {
    pub fn item(&self) -> Option<&T> {
        match self {
            Self::Item(item) => Some(item),
            Self::Ellipsis => None,
        }
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self, Self::Ellipsis)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PageRow<U> {
        match self {
            Self::Item(item) => PageRow::Item(f(item)),
            Self::Ellipsis => PageRow::Ellipsis,
        }
    }
}

impl<T: Serialize> Serialize for PageRow<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ellipsis => serializer.serialize_str("..."),
            Self::Item(item) => item.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry {
            id: 7,
            name: Some("rust book".into()),
            created_at: "2024-01-01T00:00:00Z".into(),
            revision: 0,
            hidden: false,
            superseded_by: None,
            tags: ["b".to_string(), "a".to_string()].into(),
            meta: [("read".to_string(), "bob".to_string())].into(),
            link: Some("https://doc.rust-lang.org/book/".into()),
            file: None,
            notes: Some(NoteBlock {
                block_id: 1,
                notes: vec!["chapter 4 is the key".into()],
            }),
        }
    }

    #[test]
    fn field_parse_round_trips_known_names() {
        for name in ["id", "name", "tags", "link", "file", "notes", "meta", "created_at", "revision", "hidden"] {
            assert_eq!(Field::parse(name).name(), name);
        }
        assert_eq!(Field::parse("read"), Field::MetaKey("read".into()));
    }

    #[test]
    fn project_follows_field_order() {
        let entry = sample();
        let values = entry.project(&[Field::Tags, Field::Id, Field::MetaKey("read".into())]);
        assert_eq!(values[0], json!(["a", "b", "read:bob"]));
        assert_eq!(values[1], json!(7));
        assert_eq!(values[2], json!("bob"));
    }

    #[test]
    fn missing_meta_key_projects_null() {
        assert_eq!(sample().value_of(&Field::MetaKey("nope".into())), Value::Null);
    }

    #[test]
    fn searchable_text_covers_notes() {
        let entry = sample();
        let text: Vec<&str> = entry.searchable_text().collect();
        assert!(text.contains(&"chapter 4 is the key"));
        assert!(text.contains(&"rust book"));
    }

    #[test]
    fn ellipsis_serializes_as_marker() {
        let rows = vec![PageRow::Ellipsis, PageRow::Item(vec![1, 2])];
        assert_eq!(serde_json::to_value(&rows).unwrap(), json!(["...", [1, 2]]));
    }
}
