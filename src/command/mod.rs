//! Command interpreter: text in, structured reply out.
//!
//! A command line goes through [`grammar::parse`], [`normalize::normalize`]
//! and [`bind::bind`] before the resulting [`Request`] runs against the
//! archive. Every failure along the way becomes a [`Reply::Failure`]; nothing
//! escapes [`Interpreter::handle`] as an error.

pub mod bind;
pub mod error;
pub mod grammar;
pub mod normalize;
pub mod reply;
pub mod usage;

pub use bind::{CommandKind, Request};
pub use error::{CommandError, SyntaxError};
pub use reply::{Edits, Reply};

use rusqlite::Connection;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::archive::{forget, search, store, Field, NewFile, Visibility};
use crate::config::CommandConfig;
use bind::Context;

/// Fields that travel next to the command text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auxiliary {
    /// Acting user; falls back to the configured default author.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub file: Option<NewFile>,
    /// Correlation token of the reply being edited.
    #[serde(default)]
    pub edits: Option<Edits>,
}

/// Runs commands against one archive database.
///
/// The connection sits behind a mutex: every command that touches the store
/// holds it for its whole read-modify-write sequence.
#[derive(Clone)]
pub struct Interpreter {
    db: Arc<Mutex<Connection>>,
    page_size: usize,
    default_author: String,
}

impl Interpreter {
    pub fn new(db: Arc<Mutex<Connection>>, config: &CommandConfig) -> Self {
        Self {
            db,
            page_size: config.page_size.max(1),
            default_author: config
                .default_author
                .clone()
                .unwrap_or_else(|| "local".to_string()),
        }
    }

    /// Interpret one command line.
    pub fn handle(&self, text: &str, aux: &Auxiliary) -> Reply {
        tracing::debug!(text, "handling command");

        let desc = match grammar::parse(text) {
            Ok(tree) => normalize::normalize(&tree),
            Err(err) => return fail(&CommandError::from(err), None, aux),
        };
        let kind = match desc.name.parse::<CommandKind>() {
            Ok(kind) => kind,
            Err(err) => return fail(&err, None, aux),
        };

        let author = aux.author.as_deref().unwrap_or(&self.default_author);
        let ctx = Context {
            author,
            file: aux.file.as_ref(),
        };
        match bind::bind(kind, &desc, &ctx).and_then(|request| self.run(request, aux.edits)) {
            Ok(reply) => reply,
            Err(err) => fail(&err, Some(kind), aux),
        }
    }

    fn run(&self, request: Request, edits: Option<Edits>) -> Result<Reply, CommandError> {
        if let Request::Help { topic } = request {
            return Ok(Reply::help(topic));
        }

        // A command that panicked mid-write dropped its transaction, which rolled back
        let mut conn = self.db.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering archive lock after a panicked command");
            poisoned.into_inner()
        });
        execute(&mut conn, request, edits, self.page_size)
    }
}

/// Run a bound request against the store.
pub fn execute(
    conn: &mut Connection,
    request: Request,
    edits: Option<Edits>,
    page_size: usize,
) -> Result<Reply, CommandError> {
    match request {
        Request::Add(new) => {
            let retract = generated_by(edits, CommandKind::Add);
            let id = store::add_entry_replacing(conn, &new, retract)?;
            resume(conn, id, Edits::generated(CommandKind::Add, id))
        }
        Request::Get {
            id,
            fields,
            visibility,
        } => {
            let values =
                search::get(conn, id, &fields, visibility)?.ok_or(CommandError::NotFound(id))?;
            Ok(Reply::entry(&fields, values, Edits::new(CommandKind::Get)))
        }
        Request::Update { id, diff } => {
            let new_id = match generated_by(edits, CommandKind::Update) {
                Some(previous) => store::amend_update(conn, id, &diff, previous)?,
                None => store::update_entry(conn, id, &diff)?,
            };
            resume(conn, new_id, Edits::generated(CommandKind::Update, new_id))
        }
        Request::Find {
            query,
            fields,
            page,
        } => {
            let rows = search::find(conn, &query, &fields, page, page_size)?;
            Ok(Reply::table(&fields, rows, Edits::new(CommandKind::Find)))
        }
        Request::Delete { id } => {
            let deleted = forget::delete_entry(conn, id)?;
            let mut fields = serde_json::Map::new();
            fields.insert("id".into(), id.into());
            fields.insert("deleted".into(), deleted.into());
            Ok(Reply::Entry(reply::EntryReply {
                fields,
                edits: Edits::new(CommandKind::Delete),
            }))
        }
        Request::Help { topic } => Ok(Reply::help(topic)),
    }
}

/// Id generated by an earlier run of the same kind of command.
fn generated_by(edits: Option<Edits>, kind: CommandKind) -> Option<i64> {
    edits.filter(|e| e.kind == kind).and_then(|e| e.generated_id)
}

/// Short summary of a freshly written entry.
fn resume(conn: &Connection, id: i64, edits: Edits) -> Result<Reply, CommandError> {
    let fields = Field::resume();
    let values = search::get(conn, id, &fields, Visibility::Visible)?
        .ok_or_else(|| CommandError::Internal(format!("entry {id} missing after write")))?;
    Ok(Reply::entry(&fields, values, edits))
}

fn fail(err: &CommandError, kind: Option<CommandKind>, aux: &Auxiliary) -> Reply {
    match err {
        CommandError::Internal(detail) => {
            tracing::error!(command = ?kind, error = %detail, "command failed")
        }
        _ => tracing::debug!(command = ?kind, kind = err.kind(), error = %err, "command rejected"),
    }
    Reply::failure(err, kind, aux.edits)
}
