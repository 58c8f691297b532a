use anyhow::Result;

use arquive::archive::stats::archive_stats;
use arquive::config::ArquiveConfig;

/// Display archive statistics in the terminal.
pub fn stats(config: &ArquiveConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = arquive::db::open_database(&db_path)?;

    let response = archive_stats(&conn, Some(&db_path))?;

    println!("Archive Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total entries:       {}", response.total_entries);
    println!("  Visible:             {}", response.visible_entries);
    println!("  Hidden:              {}", response.hidden_entries);
    println!("  Revised:             {}", response.revised_entries);
    println!();

    println!("Files:                 {} ({} bytes)", response.files, response.file_bytes);
    println!("Note blocks:           {}", response.note_blocks);
    println!("Database size:         {} bytes", response.db_size_bytes);

    if let Some(ref oldest) = response.oldest_entry {
        println!("Oldest entry:          {oldest}");
    }
    if let Some(ref newest) = response.newest_entry {
        println!("Newest entry:          {newest}");
    }

    Ok(())
}
