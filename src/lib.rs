//! Personal archive of links, files and notes, driven by short text commands.
//!
//! A command such as `!add example.com tags: [rust, book]` is parsed,
//! bound to a typed request and applied to an append-only SQLite entry log.
//! Entries are never edited in place: `update` writes a new revision and
//! hides the old one, `delete` only hides.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `add` | Store a link and/or attached file with name, tags, notes and metadata |
//! | `get` | Read one entry, optionally projected onto chosen fields |
//! | `update` | Write a revision: replace fields, or add/remove tags with `+[..]`/`-[..]` |
//! | `find` | Filter visible entries by keyword, tags, link, name or metadata; paginated |
//! | `delete` | Hide an entry |
//! | `help` | Usage text |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`archive`]: The versioned entry store (writes, tag algebra, search and pagination)
//! - [`command`]: Grammar, normalization, argument binding, and the [`command::Interpreter`]

pub mod archive;
pub mod command;
pub mod config;
pub mod db;
