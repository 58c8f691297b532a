use anyhow::{Context, Result};
use std::path::Path;

use arquive::archive::search::{get_entry, read_file};
use arquive::archive::Visibility;
use arquive::config::ArquiveConfig;

/// Write the blob attached to entry `id` to `dest`.
pub fn export_file(config: &ArquiveConfig, id: i64, dest: &Path) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = arquive::db::open_database(&db_path)?;

    let entry = get_entry(&conn, id, Visibility::IncludeHidden)?
        .with_context(|| format!("no entry with id {id}"))?;
    let file_ref = entry
        .file
        .with_context(|| format!("entry {id} has no attached file"))?;
    let file = read_file(&conn, file_ref.id)?
        .with_context(|| format!("file {} is missing from the archive", file_ref.id))?;

    std::fs::write(dest, &file.content)
        .with_context(|| format!("failed to write {}", dest.display()))?;

    eprintln!(
        "Exported {} ({} bytes) to {}",
        file.name,
        file.size,
        dest.display()
    );
    Ok(())
}
