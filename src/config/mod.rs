//! Configuration module for revgraph
//!
//! This module handles:
//! - Index tunables (window sizes, worker count, index wait)
//! - User-level defaults (~/.config/revgraph/config.toml)
//! - Project-level overrides (revgraph.toml next to the repository)

mod index_config;

pub use index_config::{IndexConfig, IndexOverrides};
