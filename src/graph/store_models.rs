//! Persisted node and edge types of the commit graph

use serde::{Deserialize, Serialize};

use super::GraphError;
use crate::models::{file_revision_id, Action, CommitInfo, FileRevision};

/// Edge types in the commit graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    /// commit -> each parent commit, change -> nearest ancestor changes
    Parent,
    /// commit -> first parent commit, change -> nearest first-parent ancestor changes
    FirstParent,
    /// commit -> the changes it recorded
    Contains,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 3] = [EdgeKind::Parent, EdgeKind::FirstParent, EdgeKind::Contains];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Parent => "PARENT",
            EdgeKind::FirstParent => "FIRST_PARENT",
            EdgeKind::Contains => "CONTAINS",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "PARENT" => Some(EdgeKind::Parent),
            "FIRST_PARENT" => Some(EdgeKind::FirstParent),
            "CONTAINS" => Some(EdgeKind::Contains),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which ancestry relation a traversal follows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    /// All parents (full DAG)
    #[default]
    Full,
    /// First parent only (linearized history)
    FirstParent,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Full, Axis::FirstParent];

    pub fn from_first_parent_only(first_parent_only: bool) -> Self {
        if first_parent_only {
            Axis::FirstParent
        } else {
            Axis::Full
        }
    }

    pub fn edge_kind(&self) -> EdgeKind {
        match self {
            Axis::Full => EdgeKind::Parent,
            Axis::FirstParent => EdgeKind::FirstParent,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.edge_kind().as_str())
    }
}

/// Whether a commit node has received its own payload yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommitState {
    /// Only referenced as somebody's parent so far
    Stub,
    Complete(CommitInfo),
}

/// A commit node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitNode {
    pub id: String,
    pub state: CommitState,
}

impl CommitNode {
    pub fn stub(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: CommitState::Stub,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, CommitState::Complete(_))
    }

    pub fn info(&self) -> Option<&CommitInfo> {
        match &self.state {
            CommitState::Complete(info) => Some(info),
            CommitState::Stub => None,
        }
    }

    /// Attach the commit payload.
    ///
    /// Returns `true` when the node moved from stub to complete, `false` when it
    /// already held an identical payload.
    pub fn complete(&mut self, info: &CommitInfo) -> Result<bool, GraphError> {
        match &self.state {
            CommitState::Stub => {
                self.state = CommitState::Complete(info.clone());
                Ok(true)
            }
            CommitState::Complete(existing) if existing == info => Ok(false),
            CommitState::Complete(_) => Err(GraphError::ConflictingCommit {
                id: self.id.clone(),
            }),
        }
    }
}

/// A change node: one file's state change within one commit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeNode {
    pub id: String,
    pub action: Action,
    pub path: String,
    pub old_path: Option<String>,
    /// Owning commit id, denormalized from the CONTAINS edge
    pub commit_id: String,
}

impl ChangeNode {
    /// Build the node for `revision` as recorded by `commit_id`.
    ///
    /// The id is always derived from the owning commit and the resulting
    /// path; the id carried by the revision is not trusted.
    pub fn from_revision(revision: &FileRevision, commit_id: &str) -> Self {
        Self {
            id: file_revision_id(commit_id, &revision.path).0,
            action: revision.action,
            path: revision.path.clone(),
            old_path: revision.old_path.clone(),
            commit_id: commit_id.to_string(),
        }
    }

    /// Whether `other` records the same state change, ignoring ownership
    pub fn same_change(&self, other: &ChangeNode) -> bool {
        self.id == other.id
            && self.action == other.action
            && self.path == other.path
            && self.old_path == other.old_path
    }

    /// Whether this change wrote `path` or the rename source `old_path`
    pub fn touches(&self, path: &str, old_path: Option<&str>) -> bool {
        self.path == path || old_path.is_some_and(|old| self.path == old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_stub_is_idempotent() {
        let info = CommitInfo::bare("a", &["b"]);
        let mut node = CommitNode::stub("a");
        assert!(!node.is_complete());
        assert!(node.info().is_none());

        assert!(node.complete(&info).expect("first completion"));
        assert!(node.is_complete());
        assert!(!node.complete(&info).expect("repeat completion"));
        assert_eq!(node.info(), Some(&info));
    }

    #[test]
    fn test_complete_rejects_conflicting_payload() {
        let mut node = CommitNode::stub("a");
        node.complete(&CommitInfo::bare("a", &["b"]))
            .expect("first completion");

        let err = node
            .complete(&CommitInfo::bare("a", &["c"]))
            .expect_err("conflicting payload");
        assert!(matches!(err, GraphError::ConflictingCommit { id } if id == "a"));
    }

    #[test]
    fn test_axis_edge_kinds() {
        assert_eq!(Axis::from_first_parent_only(false).edge_kind(), EdgeKind::Parent);
        assert_eq!(
            Axis::from_first_parent_only(true).edge_kind(),
            EdgeKind::FirstParent
        );
        for kind in EdgeKind::ALL {
            assert_eq!(EdgeKind::from_str_opt(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_change_id_is_derived_from_owner_and_path() {
        let revision = FileRevision {
            id: crate::models::FileRevisionId::new("x"),
            path: "a.txt".into(),
            old_path: None,
            commit_info: CommitInfo::bare("y", &["x"]),
            action: Action::Modified,
            parent_revisions: Vec::new(),
        };
        let change = ChangeNode::from_revision(&revision, "y");
        assert_eq!(change.id, "y#a.txt");
        assert_eq!(change.commit_id, "y");
    }

    #[test]
    fn test_change_touches_path_or_rename_source() {
        let change = ChangeNode {
            id: "1#a1.txt".into(),
            action: Action::Moved,
            path: "a1.txt".into(),
            old_path: Some("a.txt".into()),
            commit_id: "1".into(),
        };
        assert!(change.touches("a1.txt", None));
        assert!(change.touches("a2.txt", Some("a1.txt")));
        assert!(!change.touches("a.txt", None));
    }
}
