//! Per-command argument binding.
//!
//! Turns a [`CommandDescriptor`] into a typed [`Request`] the archive can run,
//! or a [`CommandError`] explaining what is missing or malformed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CommandError;
use super::normalize::{CommandDescriptor, Value};
use crate::archive::tags::{extract_named_tags, Meta, MetaDiff, TagDiff, TagPattern, Tags};
use crate::archive::{EntryDiff, Field, FindQuery, NewEntry, NewFile, Visibility};

/// Metadata key recording who added an entry.
pub const ADDED_BY: &str = "added_by";

type Result<T> = std::result::Result<T, CommandError>;

/// The closed set of commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Add,
    Get,
    Update,
    Find,
    Delete,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        Self::Add,
        Self::Get,
        Self::Update,
        Self::Find,
        Self::Delete,
        Self::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Get => "get",
            Self::Update => "update",
            Self::Find => "find",
            Self::Delete => "delete",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CommandError::UnknownCommand(s.to_string()))
    }
}

/// A validated operation, ready for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Add(NewEntry),
    Get {
        id: i64,
        fields: Vec<Field>,
        visibility: Visibility,
    },
    Update {
        id: i64,
        diff: EntryDiff,
    },
    Find {
        query: FindQuery,
        fields: Vec<Field>,
        page: usize,
    },
    Delete {
        id: i64,
    },
    Help {
        topic: Option<CommandKind>,
    },
}

/// Inputs that arrive next to the command text.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub author: &'a str,
    pub file: Option<&'a NewFile>,
}

/// Items of one named argument, split by delta marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouped {
    Replace(Vec<Value>),
    Delta { add: Vec<Value>, sub: Vec<Value> },
}

/// Sort a named argument's items into a replacement list or `add`/`sub`
/// buckets. Lists are spread one level. Once any delta marker is present,
/// unmarked items count as additions.
pub fn group_args(values: &[Value]) -> Grouped {
    let mut add = Vec::new();
    let mut sub = Vec::new();
    let mut plain = Vec::new();
    let mut has_delta = false;

    for value in values {
        match value {
            Value::Add(inner) => {
                has_delta = true;
                spread(&mut add, inner);
            }
            Value::Sub(inner) => {
                has_delta = true;
                spread(&mut sub, inner);
            }
            other => spread(&mut plain, other),
        }
    }

    if has_delta {
        add.append(&mut plain);
        Grouped::Delta { add, sub }
    } else {
        Grouped::Replace(plain)
    }
}

/// Expand one level of nesting: `[a, b]` and `a b` become the same items.
pub fn flatten(values: &[Value]) -> Vec<Value> {
    let mut flat = Vec::with_capacity(values.len());
    for value in values {
        spread(&mut flat, value);
    }
    flat
}

fn spread(into: &mut Vec<Value>, value: &Value) {
    match value {
        Value::List(items) => into.extend(items.iter().cloned()),
        other => into.push(other.clone()),
    }
}

pub fn bind(kind: CommandKind, desc: &CommandDescriptor, ctx: &Context<'_>) -> Result<Request> {
    let request = match kind {
        CommandKind::Add => bind_add(desc, ctx)?,
        CommandKind::Get => bind_get(desc)?,
        CommandKind::Update => bind_update(desc, ctx)?,
        CommandKind::Find => bind_find(desc)?,
        CommandKind::Delete => bind_delete(desc)?,
        CommandKind::Help => bind_help(desc)?,
    };
    tracing::debug!(command = %kind, ?request, "command bound");
    Ok(request)
}

fn bind_add(desc: &CommandDescriptor, ctx: &Context<'_>) -> Result<Request> {
    let mut free = desc.free();
    let mut new = NewEntry {
        link: free.next().map(|v| scalar("link", v)).transpose()?,
        file: ctx.file.cloned(),
        ..Default::default()
    };
    if let Some(extra) = free.next() {
        return Err(unexpected(extra));
    }

    let mut meta = Meta::new();
    for (key, values) in desc.named() {
        match key.as_str() {
            "link" => {
                if new.link.is_some() {
                    return Err(CommandError::invalid("link", "given more than once"));
                }
                new.link = Some(single(&key, &flatten(&values))?);
            }
            "name" => new.name = Some(single(&key, &flatten(&values))?),
            "tags" => new.tags.extend(tag_strings(&flatten(&values), &mut meta)?),
            "notes" => new.notes = texts(&key, &flatten(&values))?,
            "file" => return Err(file_option()),
            _ => insert_meta(&mut meta, &key, single(&key, &flatten(&values))?)?,
        }
    }

    if new.link.is_none() && new.file.is_none() {
        return Err(CommandError::MissingTarget("add"));
    }

    insert_meta(&mut meta, ADDED_BY, ctx.author.to_string())?;
    new.meta = meta;
    Ok(Request::Add(new))
}

fn bind_get(desc: &CommandDescriptor) -> Result<Request> {
    let mut free = desc.free();
    let id = entry_id(CommandKind::Get, free.next())?;
    let fields = match free.next() {
        Some(value) => field_list(value)?,
        None => Field::entry_defaults(),
    };
    if let Some(extra) = free.next() {
        return Err(unexpected(extra));
    }

    let mut visibility = Visibility::Visible;
    for (key, values) in desc.named() {
        match key.as_str() {
            "hidden" => {
                visibility = if boolean(&key, &values)? {
                    Visibility::IncludeHidden
                } else {
                    Visibility::Visible
                }
            }
            _ => return Err(CommandError::invalid(key, "not an option of get")),
        }
    }

    Ok(Request::Get {
        id,
        fields,
        visibility,
    })
}

fn bind_update(desc: &CommandDescriptor, ctx: &Context<'_>) -> Result<Request> {
    let mut free = desc.free();
    let id = entry_id(CommandKind::Update, free.next())?;
    if let Some(extra) = free.next() {
        return Err(unexpected(extra));
    }

    let mut diff = EntryDiff {
        file: ctx.file.cloned(),
        ..Default::default()
    };
    for (key, values) in desc.named() {
        let grouped = group_args(&values);
        match key.as_str() {
            "name" => diff.name = Some(replacement(&key, grouped)?),
            "link" => diff.link = Some(replacement(&key, grouped)?),
            "tags" => diff.tags = Some(tag_diff(grouped, &mut diff.meta)?),
            "notes" => match grouped {
                Grouped::Replace(items) => diff.notes = Some(texts(&key, &items)?),
                Grouped::Delta { .. } => {
                    return Err(CommandError::invalid(key, "notes can only be replaced"))
                }
            },
            "file" => return Err(file_option()),
            _ => meta_change(&key, grouped, &mut diff.meta)?,
        }
    }

    if diff.is_empty() {
        return Err(CommandError::invalid("update", "nothing to change"));
    }
    Ok(Request::Update { id, diff })
}

fn bind_find(desc: &CommandDescriptor) -> Result<Request> {
    let mut query = FindQuery::default();
    let mut fields = None;
    for value in desc.free() {
        match value {
            Value::List(_) if fields.is_none() => fields = Some(field_list(value)?),
            Value::Text(_) | Value::Int(_) if query.keyword.is_none() => {
                query.keyword = Some(scalar("keyword", value)?)
            }
            other => return Err(unexpected(other)),
        }
    }

    let mut page = 1;
    for (key, values) in desc.named() {
        match key.as_str() {
            "tags" => tag_pattern(group_args(&values), &mut query.tags)?,
            "link" => query.link = Some(single(&key, &flatten(&values))?),
            "name" => query.name = Some(single(&key, &flatten(&values))?),
            "page" => page = page_number(&flatten(&values))?,
            _ => meta_filter(&key, group_args(&values), &mut query.tags)?,
        }
    }

    Ok(Request::Find {
        query,
        fields: fields.unwrap_or_else(Field::table_defaults),
        page,
    })
}

fn bind_delete(desc: &CommandDescriptor) -> Result<Request> {
    let mut free = desc.free();
    let id = entry_id(CommandKind::Delete, free.next())?;
    if let Some(extra) = free.next() {
        return Err(unexpected(extra));
    }
    if let Some((key, _)) = desc.named().into_iter().next() {
        return Err(CommandError::invalid(key, "not an option of delete"));
    }
    Ok(Request::Delete { id })
}

fn bind_help(desc: &CommandDescriptor) -> Result<Request> {
    let topic = desc
        .free()
        .next()
        .map(|value| scalar("command", value)?.parse::<CommandKind>())
        .transpose()?;
    Ok(Request::Help { topic })
}

// ── Value helpers ─────────────────────────────────────────────────────────────

fn unexpected(value: &Value) -> CommandError {
    CommandError::invalid("arguments", format!("unexpected argument {value}"))
}

fn file_option() -> CommandError {
    CommandError::invalid("file", "attach the file to the message instead")
}

fn scalar(key: &str, value: &Value) -> Result<String> {
    value
        .as_text()
        .ok_or_else(|| CommandError::invalid(key, format!("expected a single word, got {value}")))
}

fn texts(key: &str, values: &[Value]) -> Result<Vec<String>> {
    values.iter().map(|v| scalar(key, v)).collect()
}

fn single(key: &str, values: &[Value]) -> Result<String> {
    match values {
        [value] => scalar(key, value),
        _ => Err(CommandError::invalid(
            key,
            format!("expected exactly one value, got {}", values.len()),
        )),
    }
}

fn replacement(key: &str, grouped: Grouped) -> Result<String> {
    match grouped {
        Grouped::Replace(items) => single(key, &items),
        Grouped::Delta { .. } => Err(CommandError::invalid(key, "expected a value, not a delta")),
    }
}

fn entry_id(kind: CommandKind, value: Option<&Value>) -> Result<i64> {
    let value = value.ok_or(CommandError::MissingId(kind.name()))?;
    value
        .as_int()
        .filter(|id| *id > 0)
        .ok_or_else(|| CommandError::invalid("id", format!("expected an entry id, got {value}")))
}

fn page_number(values: &[Value]) -> Result<usize> {
    let invalid = || CommandError::invalid("page", "expected a positive integer");
    match values {
        [value] => value
            .as_int()
            .filter(|page| *page > 0)
            .and_then(|page| usize::try_from(page).ok())
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn boolean(key: &str, values: &[Value]) -> Result<bool> {
    match single(key, values)?.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(CommandError::invalid(key, format!("expected true or false, got {other}"))),
    }
}

/// `[id, link]` or a single column word.
fn field_list(value: &Value) -> Result<Vec<Field>> {
    let names = match value {
        Value::List(items) => texts("fields", items)?,
        other => vec![scalar("fields", other)?],
    };
    if names.is_empty() {
        return Err(CommandError::invalid("fields", "empty field list"));
    }
    Ok(names.iter().map(|name| Field::parse(name)).collect())
}

// ── Tags and metadata ─────────────────────────────────────────────────────────

/// Record `key = value`, refusing a second, different value for the same key.
fn insert_meta(meta: &mut Meta, key: &str, value: String) -> Result<()> {
    if !matches!(Field::parse(key), Field::MetaKey(_)) {
        return Err(CommandError::invalid(key, "reserved name, not a metadata key"));
    }
    match meta.get(key) {
        Some(existing) if *existing != value => Err(CommandError::invalid(
            key,
            format!("conflicting values {existing:?} and {value:?}"),
        )),
        _ => {
            meta.insert(key.to_string(), value);
            Ok(())
        }
    }
}

/// Plain tags of `values`; `key:value` tags are recorded into `meta`.
fn tag_strings(values: &[Value], meta: &mut Meta) -> Result<Tags> {
    let (plain, named) = extract_named_tags(texts("tags", values)?);
    for (key, values) in named {
        for value in values {
            insert_meta(meta, &key, value)?;
        }
    }
    Ok(plain)
}

fn tag_diff(grouped: Grouped, meta: &mut MetaDiff) -> Result<TagDiff> {
    match grouped {
        Grouped::Replace(items) => Ok(TagDiff::Replace(tag_strings(&items, &mut meta.set)?)),
        Grouped::Delta { add, sub } => Ok(TagDiff::Delta {
            add: tag_strings(&add, &mut meta.set)?,
            sub: tag_strings(&sub, &mut meta.unset)?,
        }),
    }
}

fn meta_change(key: &str, grouped: Grouped, meta: &mut MetaDiff) -> Result<()> {
    match grouped {
        Grouped::Replace(items) => insert_meta(&mut meta.set, key, single(key, &items)?),
        Grouped::Delta { add, sub } => match (add.as_slice(), sub.as_slice()) {
            ([value], []) => insert_meta(&mut meta.set, key, scalar(key, value)?),
            ([], [value]) => insert_meta(&mut meta.unset, key, scalar(key, value)?),
            _ => Err(CommandError::invalid(key, "expected exactly one value")),
        },
    }
}

fn tag_pattern(grouped: Grouped, pattern: &mut TagPattern) -> Result<()> {
    match grouped {
        Grouped::Replace(items) => {
            let plain = tag_strings(&items, &mut pattern.include_meta)?;
            pattern.include.extend(plain);
        }
        Grouped::Delta { add, sub } => {
            let include = tag_strings(&add, &mut pattern.include_meta)?;
            let exclude = tag_strings(&sub, &mut pattern.exclude_meta)?;
            pattern.include.extend(include);
            pattern.exclude.extend(exclude);
        }
    }
    Ok(())
}

fn meta_filter(key: &str, grouped: Grouped, pattern: &mut TagPattern) -> Result<()> {
    match grouped {
        Grouped::Replace(items) => insert_meta(&mut pattern.include_meta, key, single(key, &items)?),
        Grouped::Delta { add, sub } => match (add.as_slice(), sub.as_slice()) {
            ([value], []) => insert_meta(&mut pattern.include_meta, key, scalar(key, value)?),
            ([], [value]) => insert_meta(&mut pattern.exclude_meta, key, scalar(key, value)?),
            _ => Err(CommandError::invalid(key, "expected exactly one value")),
        },
    }
}
