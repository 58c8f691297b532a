//! Structured command results handed back to the transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::bind::CommandKind;
use super::error::CommandError;
use super::usage::{self, Usage};
use crate::archive::{Field, PageRow};

/// Correlates a reply with the command that produced it, so a later edit of
/// that command can retract what it generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edits {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_id: Option<i64>,
}

impl Edits {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            generated_id: None,
        }
    }

    pub fn generated(kind: CommandKind, id: i64) -> Self {
        Self {
            kind,
            generated_id: Some(id),
        }
    }
}

/// Field values of one entry, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryReply {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub edits: Edits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    /// `"..."` rows mark skipped or remaining pages.
    pub rows: Vec<PageRow<Vec<Value>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReply {
    pub table: Table,
    pub edits: Edits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelpReply {
    pub help: Vec<Usage>,
    pub edits: Edits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// The incoming correlation token, echoed back untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<Edits>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Entry(EntryReply),
    Table(TableReply),
    Help(HelpReply),
    Failure(Failure),
}

impl Reply {
    pub(crate) fn entry(fields: &[Field], values: Vec<Value>, edits: Edits) -> Self {
        let fields = fields
            .iter()
            .map(|f| f.name().to_string())
            .zip(values)
            .collect();
        Self::Entry(EntryReply { fields, edits })
    }

    pub(crate) fn table(fields: &[Field], rows: Vec<PageRow<Vec<Value>>>, edits: Edits) -> Self {
        Self::Table(TableReply {
            table: Table {
                columns: fields.iter().map(|f| f.name().to_string()).collect(),
                rows,
            },
            edits,
        })
    }

    pub(crate) fn help(topic: Option<CommandKind>) -> Self {
        let help = match topic {
            Some(kind) => vec![usage::usage(kind)],
            None => usage::all(),
        };
        Self::Help(HelpReply {
            help,
            edits: Edits::new(CommandKind::Help),
        })
    }

    /// Usage is attached only when the command is known and the failure is
    /// about how it was called.
    pub(crate) fn failure(
        err: &CommandError,
        kind: Option<CommandKind>,
        edits: Option<Edits>,
    ) -> Self {
        Self::Failure(Failure {
            error: err.to_string(),
            kind: err.kind(),
            usage: kind.filter(|_| err.wants_usage()).map(usage::usage),
            edits,
        })
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    /// Failure kind, if this is a failure.
    pub fn error_kind(&self) -> Option<&'static str> {
        match self {
            Self::Failure(failure) => Some(failure.kind),
            _ => None,
        }
    }

    /// A field of an entry reply.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Entry(entry) => entry.fields.get(name),
            _ => None,
        }
    }

    pub fn edits(&self) -> Option<&Edits> {
        match self {
            Self::Entry(EntryReply { edits, .. })
            | Self::Table(TableReply { edits, .. })
            | Self::Help(HelpReply { edits, .. }) => Some(edits),
            Self::Failure(failure) => failure.edits.as_ref(),
        }
    }

    /// Id of the entry this reply generated, if any.
    pub fn generated_id(&self) -> Option<i64> {
        self.edits().and_then(|e| e.generated_id)
    }
}
