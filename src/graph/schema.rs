//! Graph schema definitions for redb
//!
//! Defines the node tables (commits, changes), the Change.path index, the
//! adjacency tables for PARENT / FIRST_PARENT / CONTAINS edges and a small
//! meta table. Commit.id and Change.id are the primary keys of their tables.

use redb::{MultimapTableDefinition, TableDefinition, WriteTransaction};

use super::GraphResult;

/// Bumped whenever the table layout changes
pub const SCHEMA_VERSION: &str = "1";

/// Commit nodes by id
pub const COMMITS: TableDefinition<&str, &[u8]> = TableDefinition::new("commits");

/// Change nodes by id
pub const CHANGES: TableDefinition<&str, &[u8]> = TableDefinition::new("changes");

/// Change.path index: path -> change ids
pub const CHANGE_PATHS: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("change_paths");

/// Outgoing adjacency: (edge kind, from) -> ordered list of targets
pub const EDGES_OUT: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("edges_out");

/// Incoming adjacency: (edge kind, to) -> sources
pub const EDGES_IN: MultimapTableDefinition<(&str, &str), &str> =
    MultimapTableDefinition::new("edges_in");

pub const META: TableDefinition<&str, &str> = TableDefinition::new("meta");

// Meta keys
pub const META_SCHEMA_VERSION: &str = "schema_version";
pub const META_INDEXES_ONLINE: &str = "indexes_online";
pub const META_LOADED: &str = "loaded";
pub const META_LOADED_HEAD: &str = "loaded_head";

/// Create every table (no-op for tables that exist) and record the schema
/// version. Indexes are maintained in the same transactions as the nodes, so
/// they are online as soon as this commits. The flag stays in the metadata so
/// the connection pass can wait on engines that build indexes asynchronously.
pub fn init_schema(txn: &WriteTransaction) -> GraphResult<()> {
    txn.open_table(COMMITS)?;
    txn.open_table(CHANGES)?;
    txn.open_multimap_table(CHANGE_PATHS)?;
    txn.open_table(EDGES_OUT)?;
    txn.open_multimap_table(EDGES_IN)?;

    let mut meta = txn.open_table(META)?;
    meta.insert(META_SCHEMA_VERSION, SCHEMA_VERSION)?;
    meta.insert(META_INDEXES_ONLINE, "1")?;
    Ok(())
}
