//! Tag-set algebra and the `key:value` metadata convention.
//!
//! Plain tags live in a set; `key:value` strings are split off into a metadata
//! map that is stored in its own column. [`TagDiff`] describes how a revision
//! changes the plain set, [`MetaDiff`] how it changes the map, and
//! [`TagPattern`] is the superset/disjointness filter used by `find`.

use std::collections::{BTreeMap, BTreeSet};

/// Plain tag set of an entry.
pub type Tags = BTreeSet<String>;

/// Metadata side-channel of an entry: one value per key.
pub type Meta = BTreeMap<String, String>;

/// Split `key:value` on the last colon. Both halves must be non-empty.
pub fn split_named(tag: &str) -> Option<(&str, &str)> {
    let (key, value) = tag.rsplit_once(':')?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Partition tags into plain tags and `key → values` for the `key:value` ones.
pub fn extract_named_tags<I, S>(tags: I) -> (Tags, BTreeMap<String, Vec<String>>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut plain = Tags::new();
    let mut named: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for tag in tags {
        let tag = tag.into();
        match split_named(&tag) {
            Some((key, value)) => {
                let values = named.entry(key.to_string()).or_default();
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
            None => {
                plain.insert(tag);
            }
        }
    }

    (plain, named)
}

/// Render plain tags followed by `key:value` strings, the way users type them.
pub fn render_tags(tags: &Tags, meta: &Meta) -> Vec<String> {
    tags.iter()
        .cloned()
        .chain(meta.iter().map(|(k, v)| format!("{k}:{v}")))
        .collect()
}

/// Change to a plain tag set: full replacement or add/remove delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagDiff {
    Replace(Tags),
    Delta { add: Tags, sub: Tags },
}

impl TagDiff {
    pub fn apply(&self, current: &Tags) -> Tags {
        match self {
            Self::Replace(tags) => tags.clone(),
            Self::Delta { add, sub } => current
                .iter()
                .chain(add.iter())
                .filter(|t| !sub.contains(*t))
                .cloned()
                .collect(),
        }
    }
}

/// Change to the metadata map. `set` upserts; `unset` removes a key only while
/// it still holds the given value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaDiff {
    pub set: Meta,
    pub unset: Meta,
}

impl MetaDiff {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    pub fn apply(&self, current: &Meta) -> Meta {
        let mut meta = current.clone();
        for (key, value) in &self.unset {
            if meta.get(key) == Some(value) {
                meta.remove(key);
            }
        }
        for (key, value) in &self.set {
            meta.insert(key.clone(), value.clone());
        }
        meta
    }
}

/// Tag filter: the entry must carry everything in `include` and nothing in `exclude`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPattern {
    pub include: Tags,
    pub exclude: Tags,
    pub include_meta: Meta,
    pub exclude_meta: Meta,
}

impl TagPattern {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
            && self.exclude.is_empty()
            && self.include_meta.is_empty()
            && self.exclude_meta.is_empty()
    }

    pub fn matches(&self, tags: &Tags, meta: &Meta) -> bool {
        self.include.is_subset(tags)
            && self.exclude.is_disjoint(tags)
            && self
                .include_meta
                .iter()
                .all(|(k, v)| meta.get(k) == Some(v))
            && !self
                .exclude_meta
                .iter()
                .any(|(k, v)| meta.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> Tags {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn delta_adds_and_removes() {
        let diff = TagDiff::Delta {
            add: set(&["c", "d"]),
            sub: set(&["a"]),
        };
        assert_eq!(diff.apply(&set(&["a", "b"])), set(&["b", "c", "d"]));
    }

    #[test]
    fn sub_wins_over_add_for_same_tag() {
        let diff = TagDiff::Delta {
            add: set(&["x"]),
            sub: set(&["x"]),
        };
        assert_eq!(diff.apply(&set(&["a"])), set(&["a"]));
    }

    #[test]
    fn replace_discards_current() {
        let diff = TagDiff::Replace(set(&["new tag"]));
        assert_eq!(diff.apply(&set(&["a", "b"])), set(&["new tag"]));
    }

    #[test]
    fn split_named_uses_last_colon() {
        assert_eq!(split_named("a:b:c"), Some(("a:b", "c")));
        assert_eq!(split_named("plain"), None);
        assert_eq!(split_named(":value"), None);
        assert_eq!(split_named("key:"), None);
    }

    #[test]
    fn extract_named_tags_partitions() {
        let (plain, named) = extract_named_tags(["rust", "lang:en", "lang:pt", "lang:en", "x"]);
        assert_eq!(plain, set(&["rust", "x"]));
        assert_eq!(named["lang"], vec!["en".to_string(), "pt".to_string()]);
    }

    #[test]
    fn meta_unset_requires_matching_value() {
        let current: Meta = [("read".to_string(), "bob".to_string())].into();
        let diff = MetaDiff {
            set: Meta::new(),
            unset: [("read".to_string(), "ana".to_string())].into(),
        };
        assert_eq!(diff.apply(&current), current);

        let diff = MetaDiff {
            set: [("lang".to_string(), "en".to_string())].into(),
            unset: [("read".to_string(), "bob".to_string())].into(),
        };
        let next = diff.apply(&current);
        assert!(!next.contains_key("read"));
        assert_eq!(next["lang"], "en");
    }

    #[test]
    fn pattern_superset_and_disjoint() {
        let tags = set(&["a", "b"]);
        let meta: Meta = [("added_by".to_string(), "ana".to_string())].into();

        let pattern = TagPattern {
            include: set(&["a"]),
            exclude: set(&["c"]),
            include_meta: meta.clone(),
            ..Default::default()
        };
        assert!(pattern.matches(&tags, &meta));

        let pattern = TagPattern {
            exclude: set(&["b"]),
            ..Default::default()
        };
        assert!(!pattern.matches(&tags, &meta));

        let pattern = TagPattern {
            exclude_meta: meta.clone(),
            ..Default::default()
        };
        assert!(!pattern.matches(&tags, &meta));
    }

    #[test]
    fn render_tags_appends_named() {
        let meta: Meta = [("read".to_string(), "bob".to_string())].into();
        assert_eq!(render_tags(&set(&["b", "a"]), &meta), vec!["a", "b", "read:bob"]);
    }
}
