//! On-disk locations for per-repository indexes
//!
//! Indexes live under the user cache directory rather than inside the
//! repository, keyed by the repository's canonical path.

pub mod paths;

pub use paths::{get_cache_dir, get_index_db_path};
