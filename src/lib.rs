//! revgraph - persistent commit/change graph index
//!
//! Stores commits and per-file changes as a graph on disk, links every
//! change to its nearest ancestor changes for the same file (following
//! renames and merges), and answers ordered per-file history queries along
//! the full parent DAG or the first-parent line.
//!
//! ```no_run
//! use revgraph::config::IndexConfig;
//! use revgraph::graph::Axis;
//! use revgraph::index::CommitIndex;
//! use revgraph::models::{Commit, CommitId, CommitInfo, FileChange};
//!
//! # fn main() -> Result<(), revgraph::graph::GraphError> {
//! let index = CommitIndex::in_memory(IndexConfig::default())?;
//! index.add_all(&[
//!     Commit::new(CommitInfo::bare("0", &[]), vec![FileChange::created("a.txt")]),
//!     Commit::new(CommitInfo::bare("1", &["0"]), vec![FileChange::modified("a.txt")]),
//! ])?;
//! let history = index.commit_history(&CommitId::new("1"), Axis::Full)?;
//! assert_eq!(history.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod graph;
pub mod index;
pub mod models;
