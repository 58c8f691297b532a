//! Error types for archive operations.

use thiserror::Error;

/// Result type alias using the archive's error type.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Failure of a store operation. The store is left unchanged whenever one of
/// these is returned.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// No entry (or no visible entry, for revisions) carries this id
    #[error("entry with id {0} does not exist")]
    IdNotFound(i64),

    /// Neither the raw link nor any completed form is a public URL
    #[error("invalid link: {0}")]
    InvalidLink(String),

    /// SQLite failure (wraps rusqlite::Error)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Tag or metadata column could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
