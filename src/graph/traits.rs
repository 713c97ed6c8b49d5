//! Storage trait for commit consumers

use super::GraphResult;
use crate::models::{Commit, CommitId};

/// Minimal commit storage surface shared by indexes and downstream consumers
pub trait CommitStorage {
    /// Add one commit and rebuild ancestor connections
    fn add(&self, commit: &Commit) -> GraphResult<()>;

    /// Add many commits, then rebuild ancestor connections once
    fn add_all(&self, commits: &[Commit]) -> GraphResult<()>;

    /// The complete commit with its changes, `None` if absent or only a stub
    fn get(&self, id: &CommitId) -> GraphResult<Option<Commit>>;
}
