//! Pure Rust graph storage on redb
//!
//! Nodes and adjacency lists live in redb tables (see [`super::schema`]).
//! Every access goes through a scoped transaction: [`GraphStore::write`]
//! commits when the closure returns `Ok` and rolls back on `Err` or panic,
//! [`GraphStore::read`] hands out a consistent snapshot. Read scopes can be
//! opened concurrently from worker threads.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use redb::{ReadableMultimapTable, ReadableTable, ReadableTableMetadata, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::schema::{
    self, CHANGES, CHANGE_PATHS, COMMITS, EDGES_IN, EDGES_OUT, META, META_INDEXES_ONLINE,
    META_SCHEMA_VERSION, SCHEMA_VERSION,
};
use super::store_models::{ChangeNode, CommitNode, EdgeKind};
use super::{GraphError, GraphResult};

/// Persistent commit graph store
pub struct GraphStore {
    db: redb::Database,
    /// Directory holding `graph.redb`; `None` for in-memory stores
    db_path: Option<PathBuf>,
}

impl GraphStore {
    /// Create or open a graph store in the given directory
    pub fn new(db_path: &Path) -> GraphResult<Self> {
        std::fs::create_dir_all(db_path)?;

        // redb uses a single file, not a directory
        let db_file = db_path.join("graph.redb");
        let db = redb::Database::create(&db_file)?;
        debug!("Opened graph store at {}", db_file.display());

        let store = Self {
            db,
            db_path: Some(db_path.to_path_buf()),
        };
        store.init()?;
        Ok(store)
    }

    /// Create an in-memory store (no persistence)
    pub fn in_memory() -> GraphResult<Self> {
        let db = redb::Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db, db_path: None };
        store.init()?;
        Ok(store)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init(&self) -> GraphResult<()> {
        let txn = self.db.begin_write()?;
        {
            let meta = txn.open_table(META)?;
            let stored = meta
                .get(META_SCHEMA_VERSION)?
                .map(|version| version.value().to_string());
            if let Some(version) = stored {
                if version != SCHEMA_VERSION {
                    warn!(
                        "Graph store schema version {} differs from {}",
                        version, SCHEMA_VERSION
                    );
                }
            }
        }
        schema::init_schema(&txn)?;
        txn.commit()?;
        Ok(())
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`. On `Err` the transaction is rolled back and
    /// the error is returned; on panic redb aborts the transaction on drop.
    pub fn write<R>(&self, f: impl FnOnce(&mut WriteScope<'_>) -> GraphResult<R>) -> GraphResult<R> {
        let txn = self.db.begin_write()?;
        let outcome = WriteScope::open(&txn).and_then(|mut scope| f(&mut scope));
        match outcome {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = txn.abort() {
                    warn!("Failed to roll back write transaction: {}", abort_err);
                }
                Err(err)
            }
        }
    }

    /// Run `f` against a read snapshot
    pub fn read<R>(&self, f: impl FnOnce(&ReadScope) -> GraphResult<R>) -> GraphResult<R> {
        let txn = self.db.begin_read()?;
        let scope = ReadScope::open(&txn)?;
        f(&scope)
    }

    /// Wait until the store reports its indexes as queryable.
    ///
    /// Returns `false` on timeout. Callers treat this as advisory: redb
    /// updates indexes transactionally, so only a store whose flag was
    /// cleared by an asynchronous index build ever waits here.
    pub fn await_indexes_online(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.read(|scope| scope.meta(META_INDEXES_ONLINE)) {
                Ok(Some(flag)) if flag == "1" => return true,
                Ok(_) => {}
                Err(e) => debug!("Index readiness check failed: {}", e),
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

// ==================== Read access ====================

/// Read operations shared by read and write scopes
pub trait GraphRead {
    /// Commit node by id (stub or complete)
    fn commit(&self, id: &str) -> GraphResult<Option<CommitNode>>;

    /// Change node by id
    fn change(&self, id: &str) -> GraphResult<Option<ChangeNode>>;

    /// Targets of `from`'s outgoing edges of `kind`, in insertion order
    fn targets(&self, kind: EdgeKind, from: &str) -> GraphResult<Vec<String>>;

    /// Sources of `to`'s incoming edges of `kind`
    fn sources(&self, kind: EdgeKind, to: &str) -> GraphResult<Vec<String>>;

    /// Ids of change nodes whose resulting path is exactly `path`
    fn changes_at_path(&self, path: &str) -> GraphResult<Vec<String>>;

    /// All commit ids, stubs included
    fn commit_ids(&self) -> GraphResult<Vec<String>>;

    /// All commit nodes, stubs included
    fn commit_nodes(&self) -> GraphResult<Vec<CommitNode>>;

    /// All change nodes
    fn change_nodes(&self) -> GraphResult<Vec<ChangeNode>>;

    fn change_count(&self) -> GraphResult<u64>;

    /// Every outgoing adjacency list as (kind, from, targets)
    fn edge_lists(&self) -> GraphResult<Vec<(EdgeKind, String, Vec<String>)>>;

    fn meta(&self, key: &str) -> GraphResult<Option<String>>;

    /// Change nodes recorded by a commit, in recorded order
    fn changes_of(&self, commit_id: &str) -> GraphResult<Vec<ChangeNode>> {
        let mut changes = Vec::new();
        for id in self.targets(EdgeKind::Contains, commit_id)? {
            match self.change(&id)? {
                Some(change) => changes.push(change),
                None => {
                    return Err(GraphError::MalformedGraph(format!(
                        "commit {commit_id} contains missing change {id}"
                    )))
                }
            }
        }
        Ok(changes)
    }

    /// The single commit that contains `change_id`
    fn owner_of(&self, change_id: &str) -> GraphResult<String> {
        let mut owners = self.sources(EdgeKind::Contains, change_id)?;
        match owners.len() {
            1 => Ok(owners.remove(0)),
            n => Err(GraphError::MalformedGraph(format!(
                "change {change_id} has {n} owning commits"
            ))),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> GraphResult<Vec<u8>> {
    Ok(bitcode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> GraphResult<T> {
    Ok(bitcode::deserialize(bytes)?)
}

fn load_node<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    id: &str,
) -> GraphResult<Option<T>> {
    table.get(id)?.map(|guard| decode(guard.value())).transpose()
}

fn load_values<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
) -> GraphResult<Vec<T>> {
    let mut values = Vec::new();
    for item in table.iter()? {
        let (_, value) = item?;
        values.push(decode(value.value())?);
    }
    Ok(values)
}

fn load_keys(table: &impl ReadableTable<&'static str, &'static [u8]>) -> GraphResult<Vec<String>> {
    let mut keys = Vec::new();
    for item in table.iter()? {
        let (key, _) = item?;
        keys.push(key.value().to_string());
    }
    Ok(keys)
}

fn load_targets(
    table: &impl ReadableTable<(&'static str, &'static str), &'static [u8]>,
    kind: EdgeKind,
    from: &str,
) -> GraphResult<Vec<String>> {
    match table.get((kind.as_str(), from))? {
        Some(guard) => decode(guard.value()),
        None => Ok(Vec::new()),
    }
}

fn load_edge_lists(
    table: &impl ReadableTable<(&'static str, &'static str), &'static [u8]>,
) -> GraphResult<Vec<(EdgeKind, String, Vec<String>)>> {
    let mut lists = Vec::new();
    for item in table.iter()? {
        let (key, value) = item?;
        let (kind, from) = key.value();
        let kind = EdgeKind::from_str_opt(kind)
            .ok_or_else(|| GraphError::MalformedGraph(format!("unknown edge kind {kind}")))?;
        lists.push((kind, from.to_string(), decode(value.value())?));
    }
    Ok(lists)
}

fn load_sources(
    table: &impl ReadableMultimapTable<(&'static str, &'static str), &'static str>,
    kind: EdgeKind,
    to: &str,
) -> GraphResult<Vec<String>> {
    let mut sources = Vec::new();
    for item in table.get((kind.as_str(), to))? {
        sources.push(item?.value().to_string());
    }
    Ok(sources)
}

fn load_path_entries(
    table: &impl ReadableMultimapTable<&'static str, &'static str>,
    path: &str,
) -> GraphResult<Vec<String>> {
    let mut ids = Vec::new();
    for item in table.get(path)? {
        ids.push(item?.value().to_string());
    }
    Ok(ids)
}

fn load_meta(table: &impl ReadableTable<&'static str, &'static str>, key: &str) -> GraphResult<Option<String>> {
    Ok(table.get(key)?.map(|guard| guard.value().to_string()))
}

macro_rules! impl_graph_read {
    ($scope:ty) => {
        impl GraphRead for $scope {
            fn commit(&self, id: &str) -> GraphResult<Option<CommitNode>> {
                load_node(&self.commits, id)
            }

            fn change(&self, id: &str) -> GraphResult<Option<ChangeNode>> {
                load_node(&self.changes, id)
            }

            fn targets(&self, kind: EdgeKind, from: &str) -> GraphResult<Vec<String>> {
                load_targets(&self.edges_out, kind, from)
            }

            fn sources(&self, kind: EdgeKind, to: &str) -> GraphResult<Vec<String>> {
                load_sources(&self.edges_in, kind, to)
            }

            fn changes_at_path(&self, path: &str) -> GraphResult<Vec<String>> {
                load_path_entries(&self.change_paths, path)
            }

            fn commit_ids(&self) -> GraphResult<Vec<String>> {
                load_keys(&self.commits)
            }

            fn commit_nodes(&self) -> GraphResult<Vec<CommitNode>> {
                load_values(&self.commits)
            }

            fn change_nodes(&self) -> GraphResult<Vec<ChangeNode>> {
                load_values(&self.changes)
            }

            fn change_count(&self) -> GraphResult<u64> {
                Ok(self.changes.len()?)
            }

            fn edge_lists(&self) -> GraphResult<Vec<(EdgeKind, String, Vec<String>)>> {
                load_edge_lists(&self.edges_out)
            }

            fn meta(&self, key: &str) -> GraphResult<Option<String>> {
                load_meta(&self.meta, key)
            }
        }
    };
}

/// Read-only view over one snapshot
pub struct ReadScope {
    commits: redb::ReadOnlyTable<&'static str, &'static [u8]>,
    changes: redb::ReadOnlyTable<&'static str, &'static [u8]>,
    change_paths: redb::ReadOnlyMultimapTable<&'static str, &'static str>,
    edges_out: redb::ReadOnlyTable<(&'static str, &'static str), &'static [u8]>,
    edges_in: redb::ReadOnlyMultimapTable<(&'static str, &'static str), &'static str>,
    meta: redb::ReadOnlyTable<&'static str, &'static str>,
}

impl ReadScope {
    fn open(txn: &redb::ReadTransaction) -> GraphResult<Self> {
        Ok(Self {
            commits: txn.open_table(COMMITS)?,
            changes: txn.open_table(CHANGES)?,
            change_paths: txn.open_multimap_table(CHANGE_PATHS)?,
            edges_out: txn.open_table(EDGES_OUT)?,
            edges_in: txn.open_multimap_table(EDGES_IN)?,
            meta: txn.open_table(META)?,
        })
    }
}

impl_graph_read!(ReadScope);

// ==================== Write access ====================

/// Mutable view inside one write transaction
pub struct WriteScope<'txn> {
    commits: redb::Table<'txn, &'static str, &'static [u8]>,
    changes: redb::Table<'txn, &'static str, &'static [u8]>,
    change_paths: redb::MultimapTable<'txn, &'static str, &'static str>,
    edges_out: redb::Table<'txn, (&'static str, &'static str), &'static [u8]>,
    edges_in: redb::MultimapTable<'txn, (&'static str, &'static str), &'static str>,
    meta: redb::Table<'txn, &'static str, &'static str>,
}

impl_graph_read!(WriteScope<'_>);

impl<'txn> WriteScope<'txn> {
    fn open(txn: &'txn WriteTransaction) -> GraphResult<Self> {
        Ok(Self {
            commits: txn.open_table(COMMITS)?,
            changes: txn.open_table(CHANGES)?,
            change_paths: txn.open_multimap_table(CHANGE_PATHS)?,
            edges_out: txn.open_table(EDGES_OUT)?,
            edges_in: txn.open_multimap_table(EDGES_IN)?,
            meta: txn.open_table(META)?,
        })
    }

    /// Insert or overwrite a commit node
    pub fn put_commit(&mut self, node: &CommitNode) -> GraphResult<()> {
        let bytes = encode(node)?;
        self.commits.insert(node.id.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Find a commit node by id, creating a stub if it does not exist yet
    pub fn find_or_create_commit(&mut self, id: &str) -> GraphResult<CommitNode> {
        if let Some(node) = self.commit(id)? {
            return Ok(node);
        }
        let node = CommitNode::stub(id);
        self.put_commit(&node)?;
        Ok(node)
    }

    /// Create a change node owned by `owner`, index its path and add the
    /// CONTAINS edge
    pub fn create_change(&mut self, owner: &str, node: &ChangeNode) -> GraphResult<()> {
        if self.changes.get(node.id.as_str())?.is_some() {
            return Err(GraphError::DuplicateChange {
                id: node.id.clone(),
            });
        }

        let bytes = encode(node)?;
        self.changes.insert(node.id.as_str(), bytes.as_slice())?;
        self.change_paths
            .insert(node.path.as_str(), node.id.as_str())?;
        self.add_edge(EdgeKind::Contains, owner, &node.id)
    }

    /// Append one edge to `from`'s adjacency list
    pub fn add_edge(&mut self, kind: EdgeKind, from: &str, to: &str) -> GraphResult<()> {
        let mut targets = self.targets(kind, from)?;
        targets.push(to.to_string());

        let bytes = encode(&targets)?;
        self.edges_out
            .insert((kind.as_str(), from), bytes.as_slice())?;
        self.edges_in.insert((kind.as_str(), to), from)?;
        Ok(())
    }

    /// Replace `from`'s outgoing edges of `kind` with `targets`
    pub fn set_edges(&mut self, kind: EdgeKind, from: &str, targets: &[String]) -> GraphResult<()> {
        for previous in self.targets(kind, from)? {
            self.edges_in
                .remove((kind.as_str(), previous.as_str()), from)?;
        }

        if targets.is_empty() {
            self.edges_out.remove((kind.as_str(), from))?;
            return Ok(());
        }

        let bytes = encode(&targets)?;
        self.edges_out
            .insert((kind.as_str(), from), bytes.as_slice())?;
        for target in targets {
            self.edges_in.insert((kind.as_str(), target.as_str()), from)?;
        }
        Ok(())
    }

    pub fn set_meta(&mut self, key: &str, value: &str) -> GraphResult<()> {
        self.meta.insert(key, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
