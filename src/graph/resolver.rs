//! Nearest-ancestor resolution for one commit
//!
//! For every change of a commit, finds the closest ancestor changes to the
//! same logical file along one axis. A candidate is any commit that touched
//! the change's path or its rename source. The walk from the commit stops at
//! the first candidate on each branch, so only the frontier of nearest touches
//! survives.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use super::store::GraphRead;
use super::store_models::Axis;
use super::traversal::{depth_first, Evaluation};
use super::GraphResult;

/// Ancestor change ids for every change of one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeConnections {
    pub commit_id: String,
    /// Every change of the commit has an entry; root touches map to an empty list
    pub parents_per_change: BTreeMap<String, Vec<String>>,
}

impl ChangeConnections {
    pub fn edge_count(&self) -> usize {
        self.parents_per_change.values().map(Vec::len).sum()
    }
}

/// Owning commits per path.
///
/// Only valid for the read snapshot it was filled from; the bulk builder keeps
/// one per read window so commits touching the same paths share lookups.
#[derive(Debug, Default)]
pub struct PathCandidates {
    owners: FxHashMap<String, FxHashSet<String>>,
}

impl PathCandidates {
    fn load<S: GraphRead + ?Sized>(&mut self, scope: &S, path: &str) -> GraphResult<()> {
        if self.owners.contains_key(path) {
            return Ok(());
        }
        let mut owners = FxHashSet::default();
        for change_id in scope.changes_at_path(path)? {
            owners.insert(scope.owner_of(&change_id)?);
        }
        self.owners.insert(path.to_string(), owners);
        Ok(())
    }

    fn get(&self, path: &str) -> Option<&FxHashSet<String>> {
        self.owners.get(path)
    }
}

pub struct NearestAncestorResolver;

impl NearestAncestorResolver {
    /// Resolve ancestor changes for every change recorded by `commit_id`.
    ///
    /// Read-only; a missing commit or one without changes resolves to an empty
    /// result.
    pub fn resolve<S: GraphRead + ?Sized>(
        scope: &S,
        commit_id: &str,
        axis: Axis,
    ) -> GraphResult<ChangeConnections> {
        Self::resolve_with(scope, commit_id, axis, &mut PathCandidates::default())
    }

    /// Like [`NearestAncestorResolver::resolve`], reusing path lookups from `candidates_per_path`
    pub fn resolve_with<S: GraphRead + ?Sized>(
        scope: &S,
        commit_id: &str,
        axis: Axis,
        candidates_per_path: &mut PathCandidates,
    ) -> GraphResult<ChangeConnections> {
        let mut connections = ChangeConnections {
            commit_id: commit_id.to_string(),
            ..Default::default()
        };

        let changes = scope.changes_of(commit_id)?;
        if changes.is_empty() {
            return Ok(connections);
        }

        for change in &changes {
            candidates_per_path.load(scope, &change.path)?;
            if let Some(old_path) = &change.old_path {
                candidates_per_path.load(scope, old_path)?;
            }
        }
        let candidates_per_path = &*candidates_per_path;

        let kind = axis.edge_kind();
        for change in &changes {
            let mut candidates: FxHashSet<&str> = FxHashSet::default();
            for path in std::iter::once(change.path.as_str()).chain(change.old_path.as_deref()) {
                if let Some(owners) = candidates_per_path.get(path) {
                    candidates.extend(owners.iter().map(String::as_str));
                }
            }

            let frontier = depth_first(scope, commit_id, kind, |node| {
                if node == commit_id {
                    Evaluation::ExcludeAndContinue
                } else if candidates.contains(node) {
                    Evaluation::IncludeAndPrune
                } else {
                    Evaluation::ExcludeAndContinue
                }
            })?;

            let mut parents = Vec::new();
            for ancestor in &frontier {
                for ancestor_change in scope.changes_of(ancestor)? {
                    if ancestor_change.touches(&change.path, change.old_path.as_deref()) {
                        parents.push(ancestor_change.id);
                    }
                }
            }

            connections
                .parents_per_change
                .insert(change.id.clone(), parents);
        }

        Ok(connections)
    }
}
