// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Concurrent indexing.
//!
//! Two independent tools:
//!
//! - [`SubExpressionIndexer::index_parallel_into`] splits the tree at
//!   [`parallel_depth`](SubExpressionIndexer::parallel_depth): every node at
//!   that depth roots a sub-tree that is walked on a bounded worker pool
//!   (at most [`std::thread::available_parallelism`] threads, the calling
//!   thread included). Workers claim sub-trees through an atomic counter and
//!   fill private staging map-sets; the levels above are then canonicalized
//!   on the calling thread, consuming the sub-tree results in child order.
//!   The result is identical to the sequential walk, including which error
//!   is reported first.
//! - [`SharedSubObjectMaps`] lets several threads index different trees into
//!   one map-set behind a single coarse lock. Trees are walked outside the
//!   lock; only the merge holds it.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, instrument, warn};

use crate::error::{IndexError, Result};
use crate::ident::{CanonicalHash, NodeHasher};
use crate::indexer::SubExpressionIndexer;
use crate::maps::{IndexStats, SubObjectMaps};
use crate::tree::{ChildAccessor, NodePath};

impl<A, H> SubExpressionIndexer<A, H>
where
    H: NodeHasher + Sync,
{
    /// Like [`index_into`](Self::index_into), indexing the sub-trees rooted
    /// at depth [`parallel_depth`](Self::parallel_depth) on a bounded worker
    /// pool.
    ///
    /// A `parallel_depth` of 0 degenerates to the sequential walk. Thread
    /// count never depends on the tree's fan-out; if the OS refuses a worker
    /// the remaining threads (at least the caller) finish the work.
    ///
    /// # Errors
    ///
    /// Any [`IndexError`](crate::IndexError); `maps` is unchanged on error.
    #[instrument(level = "debug", skip_all, fields(parallel_depth = self.parallel_depth()))]
    pub fn index_parallel_into<N>(&self, root: &N, maps: &mut SubObjectMaps) -> Result<CanonicalHash>
    where
        N: Sync,
        A: ChildAccessor<N> + Sync,
    {
        let mut frontier = Vec::new();
        self.collect_frontier(root, &mut NodePath::root(), &mut frontier);
        let mut subtrees = self.index_frontier(&frontier).into_iter();

        let mut staging = SubObjectMaps::new();
        let root_hash =
            self.join_upper(root, &mut NodePath::root(), &mut subtrees, &mut staging)?;
        let summary = maps.merge(staging)?;
        debug!(
            root = %root_hash.short_hex(),
            subtrees = frontier.len(),
            new_nodes = summary.new_nodes,
            new_edges = summary.new_edges,
            "indexed tree in parallel"
        );
        Ok(root_hash)
    }

    /// Parallel counterpart of [`build_index`](Self::build_index).
    ///
    /// # Errors
    ///
    /// Any [`IndexError`](crate::IndexError).
    pub fn build_index_parallel<N>(&self, root: &N) -> Result<SubObjectMaps>
    where
        N: Sync,
        A: ChildAccessor<N> + Sync,
    {
        let mut maps = SubObjectMaps::new();
        self.index_parallel_into(root, &mut maps)?;
        Ok(maps)
    }

    /// Pre-order collection of the sub-tree roots at `parallel_depth`.
    ///
    /// Stops at the first node the accessor rejects and returns `false`;
    /// [`join_upper`](Self::join_upper) reports that error when it reaches
    /// the same node, so later sub-trees are never needed.
    fn collect_frontier<'n, N>(
        &self,
        node: &'n N,
        path: &mut NodePath,
        out: &mut Vec<(&'n N, NodePath)>,
    ) -> bool
    where
        A: ChildAccessor<N>,
    {
        if path.depth() >= self.parallel_depth() {
            out.push((node, path.clone()));
            return true;
        }
        if self.check_depth(path).is_err() {
            return false;
        }
        let Ok(children) = self.accessor().children(node) else {
            return false;
        };
        for (index, child) in children.iter().enumerate() {
            path.push(index);
            let complete = self.collect_frontier(child, path, out);
            path.pop();
            if !complete {
                return false;
            }
        }
        true
    }

    /// Walk every frontier sub-tree; results come back in frontier order.
    fn index_frontier<N>(
        &self,
        frontier: &[(&N, NodePath)],
    ) -> Vec<Result<(CanonicalHash, SubObjectMaps)>>
    where
        N: Sync,
        A: ChildAccessor<N> + Sync,
    {
        let workers = thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(frontier.len());
        let next = AtomicUsize::new(0);
        let claim = || {
            let mut done = Vec::new();
            loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                let Some((node, path)) = frontier.get(i) else {
                    break;
                };
                done.push((i, self.walk(*node, path)));
            }
            done
        };

        let mut done = thread::scope(|s| {
            let handles: Vec<_> = (1..workers)
                .map_while(|_| match thread::Builder::new().spawn_scoped(s, &claim) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!(error = %e, "worker spawn refused; continuing with fewer threads");
                        None
                    }
                })
                .collect();

            let mut done = claim();
            for h in handles {
                match h.join() {
                    Ok(part) => done.extend(part),
                    Err(e) => std::panic::resume_unwind(e),
                }
            }
            done
        });

        done.sort_unstable_by_key(|(i, _)| *i);
        done.into_iter().map(|(_, result)| result).collect()
    }

    /// Canonicalize the levels above `parallel_depth` in post-order,
    /// consuming one sub-tree result per frontier node.
    fn join_upper<N, I>(
        &self,
        node: &N,
        path: &mut NodePath,
        subtrees: &mut I,
        staging: &mut SubObjectMaps,
    ) -> Result<CanonicalHash>
    where
        A: ChildAccessor<N>,
        I: Iterator<Item = Result<(CanonicalHash, SubObjectMaps)>>,
    {
        if path.depth() >= self.parallel_depth() {
            let (hash, sub) = subtrees
                .next()
                .ok_or_else(|| IndexError::malformed(path, "sub-tree result missing"))??;
            staging.merge(sub)?;
            return Ok(hash);
        }
        self.check_depth(path)?;
        let children = self.accessor().children(node).map_err(|e| e.at(path))?;
        let mut hashes = Vec::with_capacity(children.len());
        for (index, child) in children.iter().enumerate() {
            path.push(index);
            hashes.push(self.join_upper(child, path, subtrees, staging)?);
            path.pop();
        }
        let payload = self.accessor().payload(node).map_err(|e| e.at(path))?;
        self.finalize(payload, children.len(), hashes, staging, path)
    }
}

/// A map-set shared between threads behind one coarse lock.
///
/// Cloning shares the same underlying maps.
#[derive(Clone, Debug, Default)]
pub struct SharedSubObjectMaps {
    inner: Arc<Mutex<SubObjectMaps>>,
}

impl SharedSubObjectMaps {
    /// Create an empty shared map-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing map-set.
    pub fn from_maps(maps: SubObjectMaps) -> Self {
        Self {
            inner: Arc::new(Mutex::new(maps)),
        }
    }

    /// Index `root` with `indexer`, merging under the lock.
    ///
    /// # Errors
    ///
    /// Any [`IndexError`](crate::IndexError); the shared maps are unchanged
    /// on error.
    pub fn index<N, A, H>(
        &self,
        indexer: &SubExpressionIndexer<A, H>,
        root: &N,
    ) -> Result<CanonicalHash>
    where
        A: ChildAccessor<N>,
        H: NodeHasher,
    {
        let (root_hash, staging) = indexer.walk(root, &NodePath::root())?;
        let summary = self.lock().merge(staging)?;
        debug!(
            root = %root_hash.short_hex(),
            new_nodes = summary.new_nodes,
            "indexed tree into shared maps"
        );
        Ok(root_hash)
    }

    /// Run `f` with the maps locked.
    pub fn with<R>(&self, f: impl FnOnce(&SubObjectMaps) -> R) -> R {
        f(&self.lock())
    }

    /// Point-in-time copy. Representatives stay shared with the live maps.
    pub fn snapshot(&self) -> SubObjectMaps {
        self.lock().clone()
    }

    /// Entry counts.
    pub fn stats(&self) -> IndexStats {
        self.lock().stats()
    }

    /// Merges are all-or-nothing, so a poisoned lock still guards a
    /// consistent value.
    fn lock(&self) -> MutexGuard<'_, SubObjectMaps> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
