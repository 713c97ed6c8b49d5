//! Ingest and connect commands

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use revgraph::graph::BuildStats;
use revgraph::models::{Commit, CommitId, CommitRecord};

use super::IndexTarget;

/// Read a stream of JSON commit records (whitespace or newline separated)
fn read_records(input: &Path) -> Result<Vec<Commit>> {
    let reader: Box<dyn Read> = if input == Path::new("-") {
        Box::new(std::io::stdin().lock())
    } else {
        let file =
            File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut commits = Vec::new();
    for (i, record) in serde_json::Deserializer::from_reader(reader)
        .into_iter::<CommitRecord>()
        .enumerate()
    {
        let record = record.with_context(|| format!("Invalid commit record #{}", i + 1))?;
        commits.push(Commit::from(record));
    }
    Ok(commits)
}

fn create_bar_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("█▓▒░  "))
}

pub fn run(
    target: &IndexTarget,
    input: &Path,
    head: Option<String>,
    connect: bool,
    force: bool,
) -> Result<()> {
    let index = target.open()?;

    if index.is_loaded()? && !force {
        println!(
            "{} Index already loaded at {}. Use {} to ingest again.",
            style("[--]").dim(),
            style(target.db_path.display()).dim(),
            style("--force").cyan()
        );
        return Ok(());
    }

    let commits = read_records(input)?;
    println!(
        "Ingesting {} commits into {}",
        style(commits.len()).cyan(),
        style(target.db_path.display()).dim()
    );

    let bar = ProgressBar::new(commits.len() as u64);
    bar.set_style(create_bar_style()?);
    bar.set_message("commits");
    let progress = |done: usize, _total: usize| bar.set_position(done as u64);

    let stats = index
        .add_all_with(&commits, connect, Some(&progress))
        .context("Ingestion failed")?;
    bar.finish_and_clear();

    println!(
        "  {} {} added, {} unchanged, {} file changes in {} ms",
        style("[OK]").green(),
        style(stats.added).cyan(),
        stats.unchanged,
        stats.changes,
        stats.elapsed.as_millis()
    );
    print_build_stats(&stats.connections);
    if !connect {
        println!(
            "  {} Ancestor links not built. Run {}",
            style("[--]").dim(),
            style("revgraph connect").cyan()
        );
    }

    index.mark_loaded(head.map(CommitId).as_ref())?;
    Ok(())
}

pub fn connect(target: &IndexTarget) -> Result<()> {
    let index = target.open_existing()?;
    let stats = index
        .update_connections()
        .context("Building ancestor links failed")?;
    print_build_stats(&stats);
    Ok(())
}

fn print_build_stats(stats: &[BuildStats]) {
    for pass in stats {
        println!(
            "  {} {}: {} links across {} commits ({} chunks, {} workers) in {} ms",
            style("[OK]").green(),
            pass.axis,
            style(pass.edges).cyan(),
            pass.commits,
            pass.chunks,
            pass.workers,
            (pass.resolve_time + pass.write_time).as_millis()
        );
        if !pass.indexes_online {
            println!(
                "  {} Indexes were not online when the pass started",
                style("[!!]").yellow()
            );
        }
    }
}
