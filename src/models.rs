//! Core data models for revgraph
//!
//! These models describe commits and per-file revisions as they enter the
//! index (from an upstream commit/diff source) and as they come back out of
//! history queries.

use serde::{Deserialize, Serialize};

/// A typed identifier that can be rendered as the string key used in the store.
pub trait Id {
    fn string_id(&self) -> &str;
}

/// Content-addressed commit identifier (usually a full hash)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Id for CommitId {
    fn string_id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one file revision (a change node)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRevisionId(pub String);

impl FileRevisionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Id for FileRevisionId {
    fn string_id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileRevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the id of the revision of `path` produced by `commit`.
///
/// Ids are `<commit>#<path>`, so the same pair always maps to the same node.
pub fn file_revision_id(commit: &str, path: &str) -> FileRevisionId {
    FileRevisionId(format!("{commit}#{path}"))
}

/// Author or committer identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Contributor {
    pub email: String,
}

impl Contributor {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Commit metadata stored as the commit node payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: CommitId,
    pub author: Contributor,
    pub committer: Contributor,
    /// Author timestamp (milliseconds since the epoch)
    pub author_time: i64,
    /// Commit timestamp (milliseconds since the epoch)
    pub committer_time: i64,
    /// Parents in recorded order; the first one is the first parent
    pub parents: Vec<CommitId>,
}

impl CommitInfo {
    /// Metadata with empty identities and zero timestamps
    pub fn bare(id: impl Into<String>, parents: &[&str]) -> Self {
        Self {
            id: CommitId::new(id),
            author: Contributor::default(),
            committer: Contributor::default(),
            author_time: 0,
            committer_time: 0,
            parents: parents.iter().map(|p| CommitId::new(*p)).collect(),
        }
    }

    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// What happened to a file in a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Created,
    Modified,
    Deleted,
    Moved,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "CREATED",
            Action::Modified => "MODIFIED",
            Action::Deleted => "DELETED",
            Action::Moved => "MOVED",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file change as delivered by the upstream diff source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub action: Action,
    /// Path after the change
    pub path: String,
    /// Path before the change, only for moves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl FileChange {
    pub fn new(action: Action, path: &str, old_path: Option<&str>) -> Self {
        Self {
            action,
            path: path.to_string(),
            old_path: old_path.map(str::to_string),
        }
    }

    pub fn created(path: &str) -> Self {
        Self::new(Action::Created, path, None)
    }

    pub fn modified(path: &str) -> Self {
        Self::new(Action::Modified, path, None)
    }

    pub fn deleted(path: &str) -> Self {
        Self::new(Action::Deleted, path, None)
    }

    pub fn moved(old_path: &str, path: &str) -> Self {
        Self::new(Action::Moved, path, Some(old_path))
    }
}

/// A file revision: one change node together with its commit metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRevision {
    pub id: FileRevisionId,
    pub path: String,
    pub old_path: Option<String>,
    pub commit_info: CommitInfo,
    pub action: Action,
    /// Nearest ancestor revisions along all parents.
    /// Empty until connections have been built.
    pub parent_revisions: Vec<FileRevisionId>,
}

/// A commit and the file revisions it recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub info: CommitInfo,
    pub changes: Vec<FileRevision>,
}

impl Commit {
    /// Build a commit from metadata and the changes it records.
    pub fn new(info: CommitInfo, changes: impl IntoIterator<Item = FileChange>) -> Self {
        let changes = changes
            .into_iter()
            .map(|change| FileRevision {
                id: file_revision_id(info.id.string_id(), &change.path),
                path: change.path,
                old_path: change.old_path,
                commit_info: info.clone(),
                action: change.action,
                parent_revisions: Vec::new(),
            })
            .collect();
        Self { info, changes }
    }

    pub fn id(&self) -> &CommitId {
        &self.info.id
    }
}

/// Wire format of one commit in an ingestion stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    #[serde(default)]
    pub author: Contributor,
    #[serde(default)]
    pub committer: Contributor,
    #[serde(default)]
    pub author_time: i64,
    #[serde(default)]
    pub committer_time: i64,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub changes: Vec<FileChange>,
}

impl From<CommitRecord> for Commit {
    fn from(record: CommitRecord) -> Self {
        let info = CommitInfo {
            id: CommitId(record.id),
            author: record.author,
            committer: record.committer,
            author_time: record.author_time,
            committer_time: record.committer_time,
            parents: record.parents.into_iter().map(CommitId).collect(),
        };
        Commit::new(info, record.changes)
    }
}

/// Ordered result of a history traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct History<T> {
    pub items: Vec<T>,
}

impl<T> History<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for History<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a History<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_revision_id_is_commit_and_path() {
        assert_eq!(file_revision_id("0", "a.txt").0, "0#a.txt");
        assert_eq!(
            file_revision_id("abc", "src/lib.rs"),
            FileRevisionId::new("abc#src/lib.rs")
        );
    }

    #[test]
    fn test_commit_new_assigns_revision_ids() {
        let info = CommitInfo::bare("1", &["0"]);
        let commit = Commit::new(
            info,
            vec![FileChange::modified("a.txt"), FileChange::moved("b.txt", "c.txt")],
        );

        assert_eq!(commit.changes.len(), 2);
        assert_eq!(commit.changes[0].id, file_revision_id("1", "a.txt"));
        assert_eq!(commit.changes[1].path, "c.txt");
        assert_eq!(commit.changes[1].old_path.as_deref(), Some("b.txt"));
        assert_eq!(commit.changes[1].action, Action::Moved);
        assert!(commit.changes.iter().all(|c| c.parent_revisions.is_empty()));
    }

    #[test]
    fn test_commit_record_parses_minimal_json() {
        let json = r#"{"id":"2","parents":["1"],"changes":[{"action":"MOVED","path":"b","old_path":"a"}]}"#;
        let record: CommitRecord = serde_json::from_str(json).expect("parse record");
        let commit = Commit::from(record);

        assert_eq!(commit.info.parents, vec![CommitId::new("1")]);
        assert_eq!(commit.info.author, Contributor::default());
        assert_eq!(commit.changes[0].id.0, "2#b");
        assert_eq!(commit.changes[0].old_path.as_deref(), Some("a"));
    }

    #[test]
    fn test_first_parent_and_merge() {
        let merge = CommitInfo::bare("m", &["left", "right"]);
        assert!(merge.is_merge());
        assert_eq!(merge.first_parent(), Some(&CommitId::new("left")));

        let root = CommitInfo::bare("r", &[]);
        assert!(!root.is_merge());
        assert_eq!(root.first_parent(), None);
    }
}
