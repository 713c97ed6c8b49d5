//! Bulk connection builder
//!
//! Runs the nearest-ancestor resolver for every commit in the store and
//! writes the resulting change-ancestor edges. Resolution is read-only and
//! runs on a rayon pool in chunks; write-back happens on the calling thread in
//! batched transactions.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::resolver::{ChangeConnections, NearestAncestorResolver, PathCandidates};
use super::store::{GraphRead, GraphStore};
use super::store_models::Axis;
use super::GraphResult;
use crate::config::IndexConfig;

/// How commit ids are split across workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub workers: usize,
    /// Maximum commits per chunk
    pub chunk_size: usize,
}

impl ChunkPlan {
    /// Plan a pass over `total` commits.
    ///
    /// Small stores run as a single chunk on one worker. Otherwise the ids are
    /// split into roughly `workers * chunks_per_worker` chunks.
    pub fn new(total: usize, available_parallelism: usize, config: &IndexConfig) -> Self {
        if total <= config.single_thread_threshold {
            return Self {
                workers: 1,
                chunk_size: total.max(1),
            };
        }
        let workers = config.effective_workers(available_parallelism);
        Self {
            workers,
            chunk_size: total / (workers * config.chunks_per_worker.max(1)) + 1,
        }
    }

    pub fn chunk_count(&self, total: usize) -> usize {
        total.div_ceil(self.chunk_size)
    }
}

/// Outcome of one pass over one axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub axis: Axis,
    pub commits: usize,
    pub chunks: usize,
    pub workers: usize,
    /// Ancestor edges written
    pub edges: usize,
    pub indexes_online: bool,
    pub resolve_time: Duration,
    pub write_time: Duration,
}

pub struct ConnectionBuilder<'a> {
    store: &'a GraphStore,
    config: &'a IndexConfig,
    log_prefix: &'a str,
}

impl<'a> ConnectionBuilder<'a> {
    pub fn new(store: &'a GraphStore, config: &'a IndexConfig, log_prefix: &'a str) -> Self {
        Self {
            store,
            config,
            log_prefix,
        }
    }

    /// Rebuild ancestor edges on the full axis, then on the first-parent axis
    pub fn rebuild_all(&self) -> GraphResult<Vec<BuildStats>> {
        Axis::BOTH.iter().map(|axis| self.rebuild(*axis)).collect()
    }

    /// Rebuild ancestor edges for every change along `axis`.
    ///
    /// A failure in any chunk aborts the whole pass before anything is written.
    pub fn rebuild(&self, axis: Axis) -> GraphResult<BuildStats> {
        let prefix = self.log_prefix;

        info!("{} Waiting for indexes to come online...", prefix);
        let wait_started = Instant::now();
        let indexes_online = self
            .store
            .await_indexes_online(Duration::from_secs(self.config.index_wait_secs));
        if indexes_online {
            debug!("{} Indexes online in {:?}", prefix, wait_started.elapsed());
        } else {
            warn!(
                "{} Indexes not online after {}s, continuing anyway",
                prefix, self.config.index_wait_secs
            );
        }

        let ids = self.store.read(|scope| scope.commit_ids())?;
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        let plan = ChunkPlan::new(ids.len(), available, self.config);
        let chunks: Vec<&[String]> = ids.chunks(plan.chunk_size).collect();

        info!("{}({}) Updating ancestor connections for {} commits", prefix, axis, ids.len());
        info!(
            "{} {} cores available, will use {} workers, max {} commits per chunk ({} chunks)",
            prefix,
            available,
            plan.workers,
            plan.chunk_size,
            chunks.len()
        );

        let resolve_started = Instant::now();
        let results: Vec<Vec<ChangeConnections>> = if plan.workers == 1 {
            chunks
                .iter()
                .enumerate()
                .map(|(index, chunk)| self.process_chunk(index, chunk, axis))
                .collect::<GraphResult<_>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(plan.workers)
                .build()?;
            pool.install(|| {
                chunks
                    .par_iter()
                    .enumerate()
                    .map(|(index, chunk)| self.process_chunk(index, chunk, axis))
                    .collect::<GraphResult<Vec<_>>>()
            })?
        };
        let resolve_time = resolve_started.elapsed();
        info!("{} Found ancestors for all commits, creating relationships", prefix);

        // TODO: stream chunk results into the write phase instead of holding every set in memory
        let connections: Vec<ChangeConnections> = results.into_iter().flatten().collect();

        let write_started = Instant::now();
        let edges = self.write_connections(&connections, axis)?;
        let write_time = write_started.elapsed();
        info!(
            "{} Done creating {} {} relationships in {:?}",
            prefix, edges, axis, write_time
        );

        Ok(BuildStats {
            axis,
            commits: ids.len(),
            chunks: chunks.len(),
            workers: plan.workers,
            edges,
            indexes_online,
            resolve_time,
            write_time,
        })
    }

    /// Resolve one chunk, one read transaction per window
    fn process_chunk(&self, index: usize, ids: &[String], axis: Axis) -> GraphResult<Vec<ChangeConnections>> {
        let started = Instant::now();
        let total = ids.len();
        let mut done = 0;
        let mut connections = Vec::with_capacity(total);

        for window in ids.chunks(self.config.resolve_window.max(1)) {
            let window_started = Instant::now();
            self.store.read(|scope| {
                let mut candidates = PathCandidates::default();
                for id in window {
                    connections.push(NearestAncestorResolver::resolve_with(
                        scope,
                        id,
                        axis,
                        &mut candidates,
                    )?);
                }
                Ok(())
            })?;
            done += window.len();
            debug!(
                "{} Chunk {}: {}/{} done, {} processed in {:.3} s",
                self.log_prefix,
                index,
                done,
                total,
                window.len(),
                window_started.elapsed().as_secs_f64()
            );
        }

        debug!(
            "{} Chunk {}: all {} done in {} ms",
            self.log_prefix,
            index,
            done,
            started.elapsed().as_millis()
        );
        Ok(connections)
    }

    /// Write ancestor edges in batches; returns the number of edges written
    fn write_connections(&self, connections: &[ChangeConnections], axis: Axis) -> GraphResult<usize> {
        let kind = axis.edge_kind();
        let total = connections.len();
        let mut written = 0;
        let mut edges = 0;

        for batch in connections.chunks(self.config.write_window.max(1)) {
            let started = Instant::now();
            edges += self.store.write(|scope| {
                let mut created = 0;
                for connection in batch {
                    for (change_id, parents) in &connection.parents_per_change {
                        scope.set_edges(kind, change_id, parents)?;
                        created += parents.len();
                    }
                }
                Ok(created)
            })?;
            written += batch.len();
            debug!(
                "{} Added {} connection sets in {} ms, {}/{} done",
                self.log_prefix,
                batch.len(),
                started.elapsed().as_millis(),
                written,
                total
            );
        }

        Ok(edges)
    }
}
