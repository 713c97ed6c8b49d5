//! CLI command definitions and handlers

mod check;
mod clean;
mod history;
mod ingest;
mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use revgraph::config::IndexConfig;
use revgraph::graph::Axis;
use revgraph::index::CommitIndex;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// revgraph - commit/change graph index
#[derive(Parser, Debug)]
#[command(name = "revgraph")]
#[command(
    version,
    about = "Persistent commit/change graph index with per-file nearest-ancestor history",
    long_about = "revgraph stores commits and their file changes as a graph, links every \
change to the nearest earlier changes of the same file (across renames and merges) \
and answers commit and per-file history queries.\n\n\
Commit records are read as JSON, one object per commit:\n  \
{\"id\": \"c1\", \"parents\": [\"c0\"], \"changes\": [{\"action\": \"MODIFIED\", \"path\": \"a.txt\"}]}",
    after_help = "\
Examples:
  revgraph ingest commits.json --head c9     Load commits and build ancestor links
  revgraph log                               Commit history from the recorded head
  revgraph file-logs c9 --first-parent       Per-file histories of one commit
  revgraph file-log 'c9#src/lib.rs'          History of one file revision
  revgraph status                            Index location and statistics"
)]
pub struct Cli {
    /// Repository the index belongs to (default: current directory)
    #[arg(long = "repo", short = 'C', global = true, default_value = ".")]
    pub path: PathBuf,

    /// Index directory (default: per-repository cache directory)
    #[arg(long, global = true, env = "REVGRAPH_DB")]
    pub db: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of resolver workers (1-64, default: half the available cores)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load commit records (JSON stream) into the index
    Ingest {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Commit to record as the loaded head
        #[arg(long)]
        head: Option<String>,

        /// Skip building ancestor links (run `connect` later)
        #[arg(long)]
        no_connect: bool,

        /// Ingest even if the index is already marked as loaded
        #[arg(long)]
        force: bool,
    },

    /// Rebuild ancestor links between file changes
    Connect,

    /// Show one commit with its changes
    Show {
        /// Commit id
        commit: String,
    },

    /// Commit history from a commit (default: recorded head)
    Log {
        /// Commit id
        commit: Option<String>,

        /// Follow first parents only
        #[arg(long)]
        first_parent: bool,

        /// Maximum commits to show
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// History of one file revision (<commit>#<path>)
    FileLog {
        /// File revision id
        change: String,

        /// Follow first parents only
        #[arg(long)]
        first_parent: bool,
    },

    /// Histories of every file changed by a commit
    FileLogs {
        /// Commit id
        commit: String,

        /// Follow first parents only
        #[arg(long)]
        first_parent: bool,
    },

    /// Show index location, load state and statistics
    Status,

    /// Audit the index for structural violations
    Check,

    /// Delete the index
    Clean {
        /// Show what would be removed without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

/// Where the index for this invocation lives and how it is tuned
pub(crate) struct IndexTarget {
    pub repo_path: PathBuf,
    pub db_path: PathBuf,
    pub config: IndexConfig,
}

impl IndexTarget {
    fn resolve(cli: &Cli) -> Result<Self> {
        let repo_path = cli
            .path
            .canonicalize()
            .with_context(|| format!("Path does not exist: {}", cli.path.display()))?;
        let db_path = cli
            .db
            .clone()
            .unwrap_or_else(|| revgraph::cache::get_index_db_path(&repo_path));
        let config = IndexConfig::load(&repo_path)?.with_workers(cli.workers);
        config.validate()?;
        Ok(Self {
            repo_path,
            db_path,
            config,
        })
    }

    pub fn exists(&self) -> bool {
        self.db_path.exists()
    }

    /// Open the index, creating it if needed
    pub fn open(&self) -> Result<CommitIndex> {
        let index = CommitIndex::open(&self.db_path, self.config.clone())
            .with_context(|| format!("Failed to open index at {}", self.db_path.display()))?;
        Ok(index.with_log_prefix(repo_name(&self.repo_path)))
    }

    /// Open an existing index; errors if nothing has been ingested yet
    pub fn open_existing(&self) -> Result<CommitIndex> {
        if !self.exists() {
            anyhow::bail!(
                "No index at {}. Run `revgraph ingest` first.",
                self.db_path.display()
            );
        }
        self.open()
    }
}

fn repo_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("repo")
        .to_string()
}

/// Run the CLI command
pub fn run(cli: Cli) -> Result<()> {
    let target = IndexTarget::resolve(&cli)?;

    match cli.command {
        Commands::Ingest {
            input,
            head,
            no_connect,
            force,
        } => ingest::run(&target, &input, head, !no_connect, force),

        Commands::Connect => ingest::connect(&target),

        Commands::Show { commit } => history::show(&target, &commit),

        Commands::Log {
            commit,
            first_parent,
            limit,
        } => history::log(&target, commit, Axis::from_first_parent_only(first_parent), limit),

        Commands::FileLog {
            change,
            first_parent,
        } => history::file_log(&target, &change, Axis::from_first_parent_only(first_parent)),

        Commands::FileLogs {
            commit,
            first_parent,
        } => history::file_logs(&target, &commit, Axis::from_first_parent_only(first_parent)),

        Commands::Status => status::run(&target),

        Commands::Check => check::run(&target),

        Commands::Clean { dry_run } => clean::run(&target, dry_run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers_bounds() {
        assert_eq!(parse_workers("4"), Ok(4));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["revgraph", "log", "abc", "--first-parent", "-n", "3"])
            .expect("parse log");
        match cli.command {
            Commands::Log {
                commit,
                first_parent,
                limit,
            } => {
                assert_eq!(commit.as_deref(), Some("abc"));
                assert!(first_parent);
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["revgraph", "--workers", "2", "ingest", "-", "--no-connect"])
            .expect("parse ingest");
        assert_eq!(cli.workers, Some(2));
        assert!(matches!(cli.command, Commands::Ingest { no_connect: true, .. }));
    }
}
