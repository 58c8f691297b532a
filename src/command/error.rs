//! Error types for command interpretation.

use thiserror::Error;

use crate::archive::ArchiveError;

/// Malformed command text, located at a byte offset of the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at column {column}: {message} (near {excerpt:?})")]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset into the command text.
    pub position: usize,
    /// 1-based character column.
    pub column: usize,
    /// Text starting at the failure, cut to a few characters.
    pub excerpt: String,
}

const EXCERPT_CHARS: usize = 16;

impl SyntaxError {
    pub fn new(input: &str, position: usize, message: impl Into<String>) -> Self {
        let position = position.min(input.len());
        let (before, after) = input.split_at(position);
        let mut excerpt: String = after.chars().take(EXCERPT_CHARS).collect();
        if after.chars().count() > EXCERPT_CHARS {
            excerpt.push_str("...");
        }
        Self {
            message: message.into(),
            position,
            column: before.chars().count() + 1,
            excerpt,
        }
    }
}

/// Failure of a command. Every variant is reported to the caller as a
/// structured reply; none of them aborts the interpreter.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0} needs a link or an attached file")]
    MissingTarget(&'static str),

    #[error("{0} needs an entry id")]
    MissingId(&'static str),

    #[error("no entry with id {0}")]
    NotFound(i64),

    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Detail stays in the log; the caller only sees a generic message
    #[error("internal error")]
    Internal(String),
}

impl CommandError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "syntax",
            Self::UnknownCommand(_) => "unknown_command",
            Self::MissingTarget(_) => "missing_target",
            Self::MissingId(_) => "missing_id",
            Self::NotFound(_) => "not_found",
            Self::InvalidLink(_) => "invalid_link",
            Self::InvalidValue { .. } => "invalid_value",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the reply should carry usage text for the command.
    pub fn wants_usage(&self) -> bool {
        matches!(
            self,
            Self::Syntax(_) | Self::MissingTarget(_) | Self::MissingId(_) | Self::InvalidValue { .. }
        )
    }
}

impl From<ArchiveError> for CommandError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::IdNotFound(id) => Self::NotFound(id),
            ArchiveError::InvalidLink(link) => Self::InvalidLink(link),
            other => Self::Internal(other.to_string()),
        }
    }
}
