//! Status command - show index location, load state and statistics

use anyhow::Result;
use console::style;

use super::IndexTarget;

/// Run the status command
pub fn run(target: &IndexTarget) -> Result<()> {
    println!("\nrevgraph Status\n");

    println!("  Repository: {}", style(target.repo_path.display()).cyan());
    println!("  Index: {}", style(target.db_path.display()).dim());
    println!();

    if !target.exists() {
        println!(
            "  {} No index yet. Run {}",
            style("[--]").dim(),
            style("revgraph ingest").cyan()
        );
        println!();
        return Ok(());
    }

    let index = target.open()?;
    if index.is_loaded()? {
        let head = index
            .loaded_head()?
            .map(|h| h.0)
            .unwrap_or_else(|| "-".to_string());
        println!("  {} Loaded (head {})", style("[OK]").green(), style(head).yellow());
    } else {
        println!("  {} Not marked as loaded", style("[--]").dim());
    }

    let stats = index.stats()?;
    println!(
        "      {} commits ({} stubs), {} file changes",
        style(stats.commits).cyan(),
        style(stats.stubs).cyan(),
        style(stats.changes).cyan()
    );
    println!(
        "      {} PARENT, {} FIRST_PARENT, {} CONTAINS edges",
        style(stats.parent_edges).cyan(),
        style(stats.first_parent_edges).cyan(),
        style(stats.contains_edges).cyan()
    );

    println!();
    println!("  Config:");
    let config = index.config();
    let workers = config
        .workers
        .map(|w| w.to_string())
        .unwrap_or_else(|| "auto".to_string());
    println!(
        "    windows: ingest {}, resolve {}, write {}",
        config.ingest_window, config.resolve_window, config.write_window
    );
    println!("    workers: {}", workers);

    println!();
    Ok(())
}
