use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ArquiveConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub commands: CommandConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Knobs for the command interpreter.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommandConfig {
    /// Rows per `find` page.
    pub page_size: usize,
    /// Identity recorded as `added_by` when a command arrives without an author.
    pub default_author: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_arquive_dir()
            .join("archive.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            default_author: Some("local".into()),
        }
    }
}

/// Returns `~/.arquive/`, or `./.arquive/` when no home directory is known.
pub fn default_arquive_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".arquive")
}

/// Returns the default config file path: `~/.arquive/config.toml`
pub fn default_config_path() -> PathBuf {
    default_arquive_dir().join("config.toml")
}

impl ArquiveConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ArquiveConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ARQUIVE_DB, ARQUIVE_LOG_LEVEL, ARQUIVE_AUTHOR).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ARQUIVE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ARQUIVE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ARQUIVE_AUTHOR") {
            self.commands.default_author = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
