//! Index tunables
//!
//! Supports loading config from, lowest to highest priority:
//! - Built-in defaults
//! - ~/.config/revgraph/config.toml
//! - revgraph.toml in the repository directory
//! - Environment variables (REVGRAPH_WORKERS)
//! - CLI flags (applied by the caller via [`IndexConfig::with_workers`])
//!
//! Both files use an `[index]` table:
//!
//! ```toml
//! [index]
//! ingest_window = 1000
//! workers = 4
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const WORKERS_ENV: &str = "REVGRAPH_WORKERS";
pub const PROJECT_CONFIG_FILE: &str = "revgraph.toml";

/// Tunables for ingestion and the bulk connection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Commits per ingestion transaction in `add_all`
    pub ingest_window: usize,
    /// Resolver invocations per read transaction inside a chunk
    pub resolve_window: usize,
    /// Connection sets per write-back transaction
    pub write_window: usize,
    /// At or below this many commits the pass runs as one chunk on one worker
    pub single_thread_threshold: usize,
    pub chunks_per_worker: usize,
    /// Worker threads; `None` means half the available parallelism
    pub workers: Option<usize>,
    /// Advisory wait for index readiness, in seconds
    pub index_wait_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ingest_window: 1000,
            resolve_window: 200,
            write_window: 200,
            single_thread_threshold: 100,
            chunks_per_worker: 5,
            workers: None,
            index_wait_secs: 10,
        }
    }
}

/// Partial config as found in a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOverrides {
    pub ingest_window: Option<usize>,
    pub resolve_window: Option<usize>,
    pub write_window: Option<usize>,
    pub single_thread_threshold: Option<usize>,
    pub chunks_per_worker: Option<usize>,
    pub workers: Option<usize>,
    pub index_wait_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    index: IndexOverrides,
}

impl IndexConfig {
    /// Load config from all sources for the repository at `repo_path`
    pub fn load(repo_path: &Path) -> Result<Self> {
        let mut config = IndexConfig::default();

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            config.merge(read_overrides(&path)?);
        }

        let project_path = Self::project_config_path(repo_path);
        if project_path.exists() {
            config.merge(read_overrides(&project_path)?);
        }

        // Environment variables override config files
        if let Ok(value) = std::env::var(WORKERS_ENV) {
            let workers = value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("{WORKERS_ENV} must be a number, got '{value}'"))?;
            config.workers = Some(workers);
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("revgraph").join("config.toml"))
    }

    pub fn project_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(PROJECT_CONFIG_FILE)
    }

    /// Merge overrides into this config (overrides take priority)
    pub fn merge(&mut self, other: IndexOverrides) {
        if let Some(v) = other.ingest_window {
            self.ingest_window = v;
        }
        if let Some(v) = other.resolve_window {
            self.resolve_window = v;
        }
        if let Some(v) = other.write_window {
            self.write_window = v;
        }
        if let Some(v) = other.single_thread_threshold {
            self.single_thread_threshold = v;
        }
        if let Some(v) = other.chunks_per_worker {
            self.chunks_per_worker = v;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if let Some(v) = other.index_wait_secs {
            self.index_wait_secs = v;
        }
    }

    /// Apply a CLI worker override, if any
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if workers.is_some() {
            self.workers = workers;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("ingest_window", self.ingest_window),
            ("resolve_window", self.resolve_window),
            ("write_window", self.write_window),
            ("chunks_per_worker", self.chunks_per_worker),
        ];
        for (name, value) in windows {
            if value == 0 {
                bail!("{name} must be at least 1");
            }
        }
        if self.workers == Some(0) {
            bail!("workers must be at least 1");
        }
        Ok(())
    }

    /// Worker threads for the resolve phase given the available parallelism
    pub fn effective_workers(&self, available: usize) -> usize {
        self.workers.unwrap_or(available / 2).max(1)
    }
}

fn read_overrides(path: &Path) -> Result<IndexOverrides> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    debug!("Loaded index config from {}", path.display());
    Ok(file.index)
}
