#![allow(dead_code)]

use arquive::archive::store::add_entry;
use arquive::archive::NewEntry;
use arquive::command::{Auxiliary, Interpreter, Reply};
use arquive::config::CommandConfig;
use arquive::db;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Interpreter over a fresh in-memory database, default command settings.
pub fn interpreter() -> Interpreter {
    Interpreter::new(Arc::new(Mutex::new(test_db())), &CommandConfig::default())
}

/// Auxiliary fields naming only the acting user.
pub fn by(author: &str) -> Auxiliary {
    Auxiliary {
        author: Some(author.to_string()),
        ..Default::default()
    }
}

/// Run a command that must succeed; returns its reply.
pub fn ok(interp: &Interpreter, text: &str) -> Reply {
    let reply = interp.handle(text, &by("tester"));
    assert!(reply.is_success(), "{text} failed: {reply:?}");
    reply
}

/// Insert a link entry directly via the store. Returns the entry id.
pub fn insert_link(conn: &mut Connection, link: &str, tags: &[&str]) -> i64 {
    let new = NewEntry {
        link: Some(link.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    };
    add_entry(conn, &new).unwrap()
}
