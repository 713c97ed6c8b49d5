//! Commit ingestion
//!
//! Each commit becomes a commit node (completing an existing stub if its
//! children arrived first), one change node per file change, stub nodes for
//! unseen parents, PARENT edges to every parent and a FIRST_PARENT edge to
//! the first. Ancestor edges between changes are left to the bulk pass.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::CommitIndex;
use crate::graph::{BuildStats, ChangeNode, EdgeKind, GraphError, GraphRead, GraphResult, WriteScope};
use crate::models::{Commit, Id};

/// Outcome of an ingestion call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Commits written (new or completed stubs)
    pub added: usize,
    /// Commits already stored with an identical payload
    pub unchanged: usize,
    pub changes: usize,
    /// Write transactions used
    pub windows: usize,
    pub elapsed: Duration,
    /// One entry per axis when connections were rebuilt
    pub connections: Vec<BuildStats>,
}

impl CommitIndex {
    /// Add one commit and rebuild all ancestor connections
    pub fn add(&self, commit: &Commit) -> GraphResult<bool> {
        self.add_with(commit, true)
    }

    /// Add one commit in its own transaction.
    ///
    /// Returns `false` when the commit was already stored with the same payload.
    /// The rebuild runs either way when `update_parents` is set.
    pub fn add_with(&self, commit: &Commit, update_parents: bool) -> GraphResult<bool> {
        let written = self.store().write(|scope| write_commit(scope, commit))?;
        if update_parents {
            self.update_connections()?;
        }
        Ok(written)
    }

    /// Add the commit unless a complete node already exists for its id
    pub fn add_if_not_exists(&self, commit: &Commit, update_parents: bool) -> GraphResult<bool> {
        let id = commit.id().string_id();
        let exists = self
            .store()
            .read(|scope| Ok(scope.commit(id)?.is_some_and(|node| node.is_complete())))?;
        if exists {
            debug!("{} Commit {} already stored, skipping", self.log_prefix(), id);
            return Ok(false);
        }
        self.add_with(commit, update_parents)
    }

    /// Add many commits in windowed transactions, then rebuild connections once
    pub fn add_all(&self, commits: &[Commit]) -> GraphResult<IngestStats> {
        self.add_all_with(commits, true, None)
    }

    /// Add many commits, one write transaction per `ingest_window` commits.
    ///
    /// A failing commit rolls back its whole window; earlier windows stay
    /// committed. `progress` receives (done, total) after every window.
    pub fn add_all_with(
        &self,
        commits: &[Commit],
        update_parents: bool,
        progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    ) -> GraphResult<IngestStats> {
        let prefix = self.log_prefix();
        let total = commits.len();
        info!("{} Adding {} commits to the index", prefix, total);

        let started = Instant::now();
        let mut stats = IngestStats::default();
        let mut done = 0;

        for window in commits.chunks(self.config().ingest_window.max(1)) {
            let window_started = Instant::now();
            let added = self.store().write(|scope| {
                let mut added = 0;
                for commit in window {
                    if write_commit(scope, commit)? {
                        added += 1;
                    }
                }
                Ok(added)
            })?;

            stats.added += added;
            stats.unchanged += window.len() - added;
            stats.changes += window.iter().map(|c| c.changes.len()).sum::<usize>();
            stats.windows += 1;
            done += window.len();
            debug!(
                "{} Flushed {} commits in {} ms, {}/{} done",
                prefix,
                window.len(),
                window_started.elapsed().as_millis(),
                done,
                total
            );
            if let Some(cb) = progress {
                cb(done, total);
            }
        }

        stats.elapsed = started.elapsed();
        info!(
            "{} Added all {} commits in {} ms",
            prefix,
            total,
            stats.elapsed.as_millis()
        );

        if update_parents {
            stats.connections = self.update_connections()?;
        }
        Ok(stats)
    }
}

/// Write one commit inside an open transaction.
///
/// Returns `false` without touching the store when the commit is already
/// complete with an identical payload. Same metadata with a different change
/// list is a conflict.
fn write_commit(scope: &mut WriteScope<'_>, commit: &Commit) -> GraphResult<bool> {
    let id = commit.id().string_id();
    validate_commit_id(id)?;

    let changes: Vec<ChangeNode> = commit
        .changes
        .iter()
        .map(|revision| ChangeNode::from_revision(revision, id))
        .collect();

    let mut node = scope.find_or_create_commit(id)?;
    if !node.complete(&commit.info)? {
        let stored = scope.changes_of(id)?;
        let same = stored.len() == changes.len()
            && stored.iter().zip(&changes).all(|(a, b)| a.same_change(b));
        if !same {
            return Err(GraphError::ConflictingCommit { id: id.to_string() });
        }
        return Ok(false);
    }
    scope.put_commit(&node)?;

    for change in &changes {
        scope.create_change(id, change)?;
    }

    for (i, parent) in commit.info.parents.iter().enumerate() {
        let parent_id = parent.string_id();
        validate_commit_id(parent_id)?;
        scope.find_or_create_commit(parent_id)?;
        scope.add_edge(EdgeKind::Parent, id, parent_id)?;
        if i == 0 {
            scope.add_edge(EdgeKind::FirstParent, id, parent_id)?;
        }
    }
    Ok(true)
}

/// Commit ids share the edge key space with `<commit>#<path>` change ids
fn validate_commit_id(id: &str) -> GraphResult<()> {
    let reason = if id.is_empty() {
        "empty"
    } else if id.contains('#') {
        "contains '#'"
    } else {
        return Ok(());
    };
    Err(GraphError::InvalidCommitId {
        id: id.to_string(),
        reason,
    })
}
