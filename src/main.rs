mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use arquive::config::ArquiveConfig;

#[derive(Parser)]
#[command(name = "arquive", version, about = "Personal archive of links, files and notes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read commands from stdin, one per line, and print one JSON reply per line
    Run {
        /// Acting user recorded as `added_by`
        #[arg(long)]
        author: Option<String>,
    },
    /// Run a single command
    Exec {
        /// Command text, e.g. "!get 12"
        text: String,
        #[arg(long)]
        author: Option<String>,
        /// File to attach to the command
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show archive statistics
    Stats,
    /// Check database health
    Doctor,
    /// Write the file attached to an entry to disk
    ExportFile {
        /// Entry id (hidden revisions included)
        id: i64,
        /// Destination path
        dest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ArquiveConfig::load()?;

    // Log to stderr so stdout carries only replies.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run { author } => cli::run::run(&config, author).await?,
        Command::Exec { text, author, file } => {
            cli::run::exec(&config, &text, author, file.as_deref())?
        }
        Command::Stats => cli::stats::stats(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::ExportFile { id, dest } => cli::export::export_file(&config, id, &dest)?,
    }

    Ok(())
}
