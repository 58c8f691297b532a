pub mod error;
pub mod forget;
pub mod link;
pub mod search;
pub mod stats;
pub mod store;
pub mod tags;
pub mod types;

pub use error::{ArchiveError, Result};
pub use search::FindQuery;
pub use types::{Entry, EntryDiff, Field, NewEntry, NewFile, PageRow, Visibility};
