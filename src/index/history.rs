//! History queries
//!
//! Depth-first walks along one axis with global node uniqueness. Missing
//! heads yield empty results rather than errors.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::CommitIndex;
use crate::graph::traversal::reachable;
use crate::graph::{Axis, ChangeNode, EdgeKind, GraphError, GraphRead, GraphResult};
use crate::models::{Commit, CommitId, CommitInfo, FileRevision, FileRevisionId, History, Id};

impl CommitIndex {
    /// The complete commit with its changes; `None` if absent or only a stub
    pub fn get(&self, id: &CommitId) -> GraphResult<Option<Commit>> {
        self.store().read(|scope| load_commit(scope, id.string_id()))
    }

    /// Commits reachable from `head` along `axis`, head first.
    ///
    /// Stub commits are walked through but not returned.
    pub fn commit_history(&self, head: &CommitId, axis: Axis) -> GraphResult<History<Commit>> {
        self.store().read(|scope| {
            if scope.commit(head.string_id())?.is_none() {
                return Ok(History::empty());
            }
            let mut commits = Vec::new();
            for id in reachable(scope, head.string_id(), axis.edge_kind())? {
                if let Some(commit) = load_commit(scope, &id)? {
                    commits.push(commit);
                }
            }
            Ok(History::new(commits))
        })
    }

    /// Revisions of one file reachable from `head` along `axis`, head first
    pub fn changes_history(&self, head: &FileRevisionId, axis: Axis) -> GraphResult<History<FileRevision>> {
        self.store().read(|scope| {
            if scope.change(head.string_id())?.is_none() {
                return Ok(History::empty());
            }
            let mut owners = OwnerCache::default();
            change_history(scope, head.string_id(), axis, &mut owners)
        })
    }

    /// One change history per change recorded by `head`, in recorded order
    pub fn changes_histories_for_commit(
        &self,
        head: &CommitId,
        axis: Axis,
    ) -> GraphResult<Vec<History<FileRevision>>> {
        self.store().read(|scope| {
            if scope.commit(head.string_id())?.is_none() {
                debug!("{} Commit {} not found in the index", self.log_prefix(), head);
                return Ok(Vec::new());
            }
            let mut owners = OwnerCache::default();
            scope
                .changes_of(head.string_id())?
                .iter()
                .map(|change| change_history(scope, &change.id, axis, &mut owners))
                .collect()
        })
    }

    /// Direct ancestor edges of one change along `axis`
    pub fn change_ancestors(&self, change: &FileRevisionId, axis: Axis) -> GraphResult<Vec<FileRevisionId>> {
        self.store().read(|scope| {
            Ok(scope
                .targets(axis.edge_kind(), change.string_id())?
                .into_iter()
                .map(FileRevisionId)
                .collect())
        })
    }
}

/// Commit payloads by id, loaded once per query
type OwnerCache = FxHashMap<String, CommitInfo>;

fn load_commit<S: GraphRead + ?Sized>(scope: &S, id: &str) -> GraphResult<Option<Commit>> {
    let Some(node) = scope.commit(id)? else {
        return Ok(None);
    };
    let Some(info) = node.info() else {
        return Ok(None);
    };

    let changes = scope
        .changes_of(id)?
        .into_iter()
        .map(|change| to_revision(scope, change, info))
        .collect::<GraphResult<Vec<_>>>()?;
    Ok(Some(Commit {
        info: info.clone(),
        changes,
    }))
}

fn change_history<S: GraphRead + ?Sized>(
    scope: &S,
    head: &str,
    axis: Axis,
    owners: &mut OwnerCache,
) -> GraphResult<History<FileRevision>> {
    let mut revisions = Vec::new();
    for id in reachable(scope, head, axis.edge_kind())? {
        let change = scope
            .change(&id)?
            .ok_or_else(|| GraphError::MalformedGraph(format!("ancestor edge to missing change {id}")))?;
        let info = owner_info(scope, &change.id, owners)?;
        revisions.push(to_revision(scope, change, &info)?);
    }
    Ok(History::new(revisions))
}

/// Payload of the single commit owning `change_id`
fn owner_info<S: GraphRead + ?Sized>(
    scope: &S,
    change_id: &str,
    owners: &mut OwnerCache,
) -> GraphResult<CommitInfo> {
    let owner = scope.owner_of(change_id)?;
    if let Some(info) = owners.get(&owner) {
        return Ok(info.clone());
    }
    let info = scope
        .commit(&owner)?
        .and_then(|node| node.info().cloned())
        .ok_or_else(|| GraphError::MalformedGraph(format!("change {change_id} is owned by stub commit {owner}")))?;
    owners.insert(owner, info.clone());
    Ok(info)
}

/// Parent revisions always follow the full axis
fn to_revision<S: GraphRead + ?Sized>(scope: &S, change: ChangeNode, info: &CommitInfo) -> GraphResult<FileRevision> {
    let parent_revisions = scope
        .targets(EdgeKind::Parent, &change.id)?
        .into_iter()
        .map(FileRevisionId)
        .collect();
    Ok(FileRevision {
        id: FileRevisionId(change.id),
        path: change.path,
        old_path: change.old_path,
        commit_info: info.clone(),
        action: change.action,
        parent_revisions,
    })
}
