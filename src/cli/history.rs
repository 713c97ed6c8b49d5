//! Show, log, file-log and file-logs commands

use anyhow::{Context, Result};
use console::style;

use revgraph::graph::Axis;
use revgraph::models::{Action, Commit, CommitId, CommitInfo, FileRevision, FileRevisionId};

use super::IndexTarget;

/// Render a millisecond timestamp as UTC
fn format_time(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn short(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

fn action_label(action: Action) -> console::StyledObject<&'static str> {
    match action {
        Action::Created => style("A").green(),
        Action::Modified => style("M").yellow(),
        Action::Deleted => style("D").red(),
        Action::Moved => style("R").cyan(),
    }
}

fn print_commit_line(info: &CommitInfo) {
    let email = if info.author.email.is_empty() {
        "-"
    } else {
        info.author.email.as_str()
    };
    println!(
        "{} {} {}",
        style(short(&info.id.0)).yellow(),
        style(format_time(info.author_time)).dim(),
        email
    );
}

fn print_revision(revision: &FileRevision) {
    let path = match &revision.old_path {
        Some(old) => format!("{} -> {}", old, revision.path),
        None => revision.path.clone(),
    };
    println!("  {} {}", action_label(revision.action), path);
}

pub fn show(target: &IndexTarget, commit: &str) -> Result<()> {
    let index = target.open_existing()?;
    let Some(commit) = index.get(&CommitId::new(commit))? else {
        anyhow::bail!("Commit {} not found in the index", commit);
    };
    print_commit(&commit);
    Ok(())
}

fn print_commit(commit: &Commit) {
    let info = &commit.info;
    println!("commit {}", style(&info.id.0).yellow());
    let parents: Vec<&str> = info.parents.iter().map(|p| p.0.as_str()).collect();
    if !parents.is_empty() {
        println!("parents   {}", parents.join(" "));
    }
    println!(
        "author    {} {}",
        info.author.email,
        style(format_time(info.author_time)).dim()
    );
    println!(
        "committer {} {}",
        info.committer.email,
        style(format_time(info.committer_time)).dim()
    );
    println!();
    for revision in &commit.changes {
        print_revision(revision);
        for parent in &revision.parent_revisions {
            println!("      {} {}", style("<-").dim(), parent);
        }
    }
}

pub fn log(target: &IndexTarget, commit: Option<String>, axis: Axis, limit: Option<usize>) -> Result<()> {
    let index = target.open_existing()?;
    let head = match commit {
        Some(id) => CommitId(id),
        None => index
            .loaded_head()?
            .context("No head recorded for this index; pass a commit id")?,
    };

    let history = index.commit_history(&head, axis)?;
    if history.is_empty() {
        anyhow::bail!("Commit {} not found in the index", head);
    }
    for commit in history.iter().take(limit.unwrap_or(usize::MAX)) {
        print_commit_line(&commit.info);
    }
    Ok(())
}

pub fn file_log(target: &IndexTarget, change: &str, axis: Axis) -> Result<()> {
    let index = target.open_existing()?;
    let history = index.changes_history(&FileRevisionId::new(change), axis)?;
    if history.is_empty() {
        anyhow::bail!("File revision {} not found in the index", change);
    }
    for revision in &history {
        print_commit_line(&revision.commit_info);
        print_revision(revision);
    }
    Ok(())
}

pub fn file_logs(target: &IndexTarget, commit: &str, axis: Axis) -> Result<()> {
    let index = target.open_existing()?;
    let histories = index.changes_histories_for_commit(&CommitId::new(commit), axis)?;
    if histories.is_empty() {
        println!("{} No file changes recorded for {}", style("[--]").dim(), commit);
        return Ok(());
    }
    for history in &histories {
        let Some(head) = history.iter().next() else {
            continue;
        };
        println!(
            "{} ({} revisions)",
            style(&head.path).bold(),
            style(history.len()).cyan()
        );
        for revision in history {
            println!(
                "  {} {} {}",
                action_label(revision.action),
                style(short(&revision.commit_info.id.0)).yellow(),
                style(format_time(revision.commit_info.author_time)).dim()
            );
        }
    }
    Ok(())
}
