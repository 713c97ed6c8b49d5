//! Commit index facade
//!
//! `CommitIndex` owns one graph store and exposes ingestion (see [`ingest`]),
//! the bulk connection pass and history queries (see [`history`]).

mod history;
mod ingest;

pub use ingest::IngestStats;

use std::path::Path;

use tracing::info;

use crate::config::IndexConfig;
use crate::graph::integrity::{self, IntegrityReport};
use crate::graph::schema::{META_LOADED, META_LOADED_HEAD};
use crate::graph::{BuildStats, CommitStorage, ConnectionBuilder, EdgeKind, GraphRead, GraphResult, GraphStore};
use crate::models::{Commit, CommitId};

const DEFAULT_LOG_PREFIX: &str = "revgraph";

/// Node and edge counts of one index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Commit nodes, stubs included
    pub commits: usize,
    pub stubs: usize,
    pub changes: u64,
    /// Commit -> parent and change -> ancestor edges
    pub parent_edges: usize,
    pub first_parent_edges: usize,
    pub contains_edges: usize,
}

impl IndexStats {
    pub fn complete_commits(&self) -> usize {
        self.commits - self.stubs
    }
}

/// Persistent commit/change graph index
pub struct CommitIndex {
    store: GraphStore,
    config: IndexConfig,
    log_prefix: String,
}

impl CommitIndex {
    /// Open (or create) the index stored in `path`
    pub fn open(path: &Path, config: IndexConfig) -> GraphResult<Self> {
        let store = GraphStore::new(path)?;
        info!("Opened commit index at {}", path.display());
        Ok(Self::with_store(store, config))
    }

    /// Index without persistence
    pub fn in_memory(config: IndexConfig) -> GraphResult<Self> {
        Ok(Self::with_store(GraphStore::in_memory()?, config))
    }

    fn with_store(store: GraphStore, config: IndexConfig) -> Self {
        Self {
            store,
            config,
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
        }
    }

    /// Prefix for bulk-phase log lines, usually the repository name
    pub fn with_log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    pub fn log_prefix(&self) -> &str {
        &self.log_prefix
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Rebuild change-ancestor edges for every commit, full axis first
    pub fn update_connections(&self) -> GraphResult<Vec<BuildStats>> {
        ConnectionBuilder::new(&self.store, &self.config, &self.log_prefix).rebuild_all()
    }

    pub fn stats(&self) -> GraphResult<IndexStats> {
        self.store.read(|scope| {
            let commits = scope.commit_nodes()?;
            let mut stats = IndexStats {
                commits: commits.len(),
                stubs: commits.iter().filter(|c| !c.is_complete()).count(),
                changes: scope.change_count()?,
                ..Default::default()
            };
            for (kind, _, targets) in scope.edge_lists()? {
                match kind {
                    EdgeKind::Parent => stats.parent_edges += targets.len(),
                    EdgeKind::FirstParent => stats.first_parent_edges += targets.len(),
                    EdgeKind::Contains => stats.contains_edges += targets.len(),
                }
            }
            Ok(stats)
        })
    }

    pub fn check_integrity(&self) -> GraphResult<IntegrityReport> {
        self.store.read(|scope| integrity::check(scope))
    }

    /// Record that the repository has been fully loaded, optionally up to `head`
    pub fn mark_loaded(&self, head: Option<&CommitId>) -> GraphResult<()> {
        self.store.write(|scope| {
            scope.set_meta(META_LOADED, "1")?;
            scope.set_meta(META_LOADED_HEAD, head.map(|h| h.0.as_str()).unwrap_or(""))
        })
    }

    pub fn is_loaded(&self) -> GraphResult<bool> {
        self.store
            .read(|scope| Ok(scope.meta(META_LOADED)?.as_deref() == Some("1")))
    }

    /// Head recorded by [`CommitIndex::mark_loaded`]
    pub fn loaded_head(&self) -> GraphResult<Option<CommitId>> {
        self.store.read(|scope| {
            Ok(scope
                .meta(META_LOADED_HEAD)?
                .filter(|head| !head.is_empty())
                .map(CommitId))
        })
    }
}

impl CommitStorage for CommitIndex {
    fn add(&self, commit: &Commit) -> GraphResult<()> {
        CommitIndex::add(self, commit).map(|_| ())
    }

    fn add_all(&self, commits: &[Commit]) -> GraphResult<()> {
        CommitIndex::add_all(self, commits).map(|_| ())
    }

    fn get(&self, id: &CommitId) -> GraphResult<Option<Commit>> {
        CommitIndex::get(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitInfo, FileChange};
    use tempfile::tempdir;

    fn commit(id: &str, parents: &[&str], changes: Vec<FileChange>) -> Commit {
        Commit::new(CommitInfo::bare(id, parents), changes)
    }

    #[test]
    fn test_stats_count_nodes_and_edges() {
        let index = CommitIndex::in_memory(IndexConfig::default()).expect("create index");
        index
            .add_all(&[
                commit("0", &[], vec![FileChange::created("a")]),
                commit("1", &["0"], vec![FileChange::modified("a"), FileChange::created("b")]),
            ])
            .expect("add commits");

        let stats = index.stats().expect("stats");
        assert_eq!(stats.commits, 2);
        assert_eq!(stats.stubs, 0);
        assert_eq!(stats.complete_commits(), 2);
        assert_eq!(stats.changes, 3);
        assert_eq!(stats.contains_edges, 3);
        // 1 -> 0 plus 1#a -> 0#a
        assert_eq!(stats.parent_edges, 2);
        assert_eq!(stats.first_parent_edges, 2);
    }

    #[test]
    fn test_loaded_marker() {
        let index = CommitIndex::in_memory(IndexConfig::default()).expect("create index");
        assert!(!index.is_loaded().expect("is_loaded"));
        assert_eq!(index.loaded_head().expect("loaded_head"), None);

        index
            .mark_loaded(Some(&CommitId::new("abc")))
            .expect("mark loaded");
        assert!(index.is_loaded().expect("is_loaded"));
        assert_eq!(
            index.loaded_head().expect("loaded_head"),
            Some(CommitId::new("abc"))
        );
    }

    #[test]
    fn test_reopen_keeps_commits() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("index");
        {
            let index = CommitIndex::open(&path, IndexConfig::default()).expect("open index");
            index
                .add(&commit("0", &[], vec![FileChange::created("a")]))
                .expect("add commit");
        }

        let index = CommitIndex::open(&path, IndexConfig::default()).expect("reopen index");
        let stored = index.get(&CommitId::new("0")).expect("get").expect("commit 0");
        assert_eq!(stored.changes.len(), 1);
        assert!(index.check_integrity().expect("check").is_ok());
    }

    #[test]
    fn test_commit_storage_trait() {
        let index = CommitIndex::in_memory(IndexConfig::default()).expect("create index");
        let storage: &dyn CommitStorage = &index;
        storage
            .add_all(&[commit("0", &[], vec![]), commit("1", &["0"], vec![])])
            .expect("add_all");
        assert!(storage.get(&CommitId::new("1")).expect("get").is_some());
        assert!(storage.get(&CommitId::new("2")).expect("get").is_none());
    }
}
