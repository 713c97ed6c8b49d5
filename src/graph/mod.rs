//! Commit/change graph for per-file history
//!
//! Pure Rust implementation on top of redb.
//! Commits and file changes are nodes; PARENT, FIRST_PARENT and CONTAINS are
//! edges. Change nodes get PARENT / FIRST_PARENT edges to their nearest
//! ancestor changes once [`connections::ConnectionBuilder`] has run.

pub mod connections;
pub mod integrity;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod store_models;
pub mod traits;
pub mod traversal;

pub use connections::{BuildStats, ChunkPlan, ConnectionBuilder};
pub use integrity::{IntegrityReport, Violation};
pub use resolver::{ChangeConnections, NearestAncestorResolver, PathCandidates};
pub use store::{GraphRead, GraphStore, ReadScope, WriteScope};
pub use store_models::{Axis, ChangeNode, CommitNode, CommitState, EdgeKind};
pub use traits::CommitStorage;
pub use traversal::Evaluation;

use thiserror::Error;

/// Errors raised by the graph layer
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("failed to encode or decode a stored value: {0}")]
    Encoding(#[from] bitcode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid commit id '{id}': {reason}")]
    InvalidCommitId { id: String, reason: &'static str },

    #[error("commit {id} is already stored with different metadata or changes")]
    ConflictingCommit { id: String },

    #[error("change {id} appears more than once in its commit")]
    DuplicateChange { id: String },

    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type GraphResult<T> = Result<T, GraphError>;

macro_rules! storage_error_from {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for GraphError {
                fn from(err: $err) -> Self {
                    GraphError::Storage(err.into())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
