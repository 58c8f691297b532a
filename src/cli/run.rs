//! CLI `run` and `exec` commands: feed command text to the interpreter.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use arquive::archive::NewFile;
use arquive::command::{Auxiliary, Edits, Interpreter, Reply};
use arquive::config::ArquiveConfig;
use arquive::db;

/// A stdin line written as JSON, carrying auxiliary fields next to the text.
#[derive(Debug, Deserialize)]
struct Envelope {
    text: String,
    #[serde(flatten)]
    aux: Auxiliary,
}

fn open_interpreter(config: &ArquiveConfig) -> Result<Interpreter> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");
    Ok(Interpreter::new(Arc::new(Mutex::new(conn)), &config.commands))
}

/// Plain lines are command text; lines starting with `{` are [`Envelope`]s.
fn parse_line(line: &str) -> serde_json::Result<(String, Auxiliary)> {
    if line.starts_with('{') {
        let envelope: Envelope = serde_json::from_str(line)?;
        Ok((envelope.text, envelope.aux))
    } else {
        Ok((line.to_string(), Auxiliary::default()))
    }
}

/// Serve commands from stdin until it closes, one JSON reply per line on stdout.
pub async fn run(config: &ArquiveConfig, author: Option<String>) -> Result<()> {
    let interpreter = Arc::new(open_interpreter(config)?);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    tracing::info!("reading commands from stdin");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let out = match parse_line(line) {
            Ok((text, mut aux)) => {
                if aux.author.is_none() {
                    aux.author = author.clone();
                }
                let edits = aux.edits;
                let interpreter = Arc::clone(&interpreter);
                answer(move || interpreter.handle(&text, &aux), edits).await?
            }
            Err(e) => {
                tracing::warn!(error = %e, "unreadable input line");
                serde_json::json!({
                    "error": format!("invalid JSON envelope: {e}"),
                    "kind": "invalid_value",
                })
                .to_string()
            }
        };

        stdout.write_all(out.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

/// Run a command off the reactor and render its reply line.
///
/// Store access is synchronous, so the command runs on a blocking task. A
/// panic inside it is answered with an internal failure instead of ending
/// the loop.
async fn answer<F>(command: F, edits: Option<Edits>) -> Result<String>
where
    F: FnOnce() -> Reply + Send + 'static,
{
    match tokio::task::spawn_blocking(command).await {
        Ok(reply) => Ok(serde_json::to_string(&reply)?),
        Err(e) => {
            tracing::error!(error = %e, "command task failed");
            let mut failure = serde_json::json!({
                "error": "internal error",
                "kind": "internal",
            });
            if let Some(edits) = edits {
                failure["edits"] = serde_json::to_value(edits)?;
            }
            Ok(failure.to_string())
        }
    }
}

/// Run one command and print its reply.
pub fn exec(
    config: &ArquiveConfig,
    text: &str,
    author: Option<String>,
    file: Option<&Path>,
) -> Result<()> {
    let interpreter = open_interpreter(config)?;
    let aux = Auxiliary {
        author,
        file: file.map(read_attachment).transpose()?,
        edits: None,
    };

    let reply = interpreter.handle(text, &aux);
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn read_attachment(path: &Path) -> Result<NewFile> {
    let content =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(NewFile { name, content })
}
