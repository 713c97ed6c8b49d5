//! Clean command - remove the index directory

use anyhow::{Context, Result};

use super::IndexTarget;

pub fn run(target: &IndexTarget, dry_run: bool) -> Result<()> {
    if !target.exists() {
        println!("No index found at {}.", target.db_path.display());
        return Ok(());
    }

    println!("Found index: {}", target.db_path.display());

    if dry_run {
        println!("\nDry run - nothing removed. Run without --dry-run to delete.");
        return Ok(());
    }

    std::fs::remove_dir_all(&target.db_path)
        .with_context(|| format!("Failed to remove {}", target.db_path.display()))?;
    println!("Removed: {}", target.db_path.display());
    Ok(())
}
