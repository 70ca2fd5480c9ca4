// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Post-order sub-expression indexer.
//!
//! The walk uses an explicit stack, so input depth is bounded by
//! `max_depth` rather than by the thread's stack. A node is finalized exactly
//! once, strictly after all of its children; each finalized child pushes its
//! canonical hash onto its parent's frame, so no side table keyed by node
//! identity is needed.
//!
//! Every call indexes into a fresh staging map-set. Only a fully indexed
//! tree is merged into the caller's maps; a failed call leaves them as they
//! were.

use tracing::{debug, instrument, trace};

use crate::error::{IndexError, Result};
use crate::ident::{Blake3Hasher, CanonicalHash, NodeHasher, ShapeHash};
use crate::maps::SubObjectMaps;
use crate::tree::{ChildAccessor, FieldAccessor, NodePath, Payload};
use crate::truncate::{canonical_hash_of_bytes, shape_hash, truncate};

/// Default limit on the number of edges between the root and any node.
pub const DEFAULT_MAX_DEPTH: usize = 65_536;

/// Builds [`SubObjectMaps`] from trees.
///
/// Holds the node accessor (which field holds the children), the digest,
/// and traversal limits. Reusable across any number of trees.
#[derive(Clone, Debug)]
pub struct SubExpressionIndexer<A, H = Blake3Hasher> {
    accessor: A,
    hasher: H,
    max_depth: usize,
    parallel_depth: usize,
}

impl Default for SubExpressionIndexer<FieldAccessor, Blake3Hasher> {
    fn default() -> Self {
        Self::new(FieldAccessor::default(), Blake3Hasher)
    }
}

struct Frame<'n, N> {
    node: &'n N,
    children: &'n [N],
    next: usize,
    hashes: Vec<CanonicalHash>,
}

impl<A, H> SubExpressionIndexer<A, H> {
    /// Indexer with the default depth limit and sequential traversal.
    pub fn new(accessor: A, hasher: H) -> Self {
        Self {
            accessor,
            hasher,
            max_depth: DEFAULT_MAX_DEPTH,
            parallel_depth: 0,
        }
    }

    /// Set the depth limit. Deeper inputs fail with `MalformedTree`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fork one thread per child for nodes shallower than `parallel_depth`
    /// (see [`index_parallel_into`](Self::index_parallel_into)).
    pub fn with_parallel_depth(mut self, parallel_depth: usize) -> Self {
        self.parallel_depth = parallel_depth;
        self
    }

    /// The node accessor.
    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// The digest.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Depth limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Fork depth for parallel indexing.
    pub fn parallel_depth(&self) -> usize {
        self.parallel_depth
    }
}

impl<A, H> SubExpressionIndexer<A, H>
where
    H: NodeHasher,
{
    /// Index `root` into `maps`, returning the root's canonical hash.
    ///
    /// Re-indexing already-seen sub-trees is a no-op insert; structurally
    /// equal sub-trees share the representative already stored in `maps`.
    ///
    /// # Errors
    ///
    /// Any [`IndexError`]; `maps` is unchanged on error.
    #[instrument(level = "debug", skip_all, fields(max_depth = self.max_depth))]
    pub fn index_into<N>(&self, root: &N, maps: &mut SubObjectMaps) -> Result<CanonicalHash>
    where
        A: ChildAccessor<N>,
    {
        let (root_hash, staging) = self.walk(root, &NodePath::root())?;
        let staged = staging.len();
        let summary = maps.merge(staging)?;
        debug!(
            root = %root_hash.short_hex(),
            staged,
            new_nodes = summary.new_nodes,
            new_edges = summary.new_edges,
            "indexed tree"
        );
        Ok(root_hash)
    }

    /// Index `root` into a fresh map-set.
    ///
    /// # Errors
    ///
    /// Any [`IndexError`].
    pub fn build_index<N>(&self, root: &N) -> Result<SubObjectMaps>
    where
        A: ChildAccessor<N>,
    {
        let mut maps = SubObjectMaps::new();
        self.index_into(root, &mut maps)?;
        Ok(maps)
    }

    /// Canonical hash of `root` without keeping any index.
    ///
    /// # Errors
    ///
    /// Any [`IndexError`].
    pub fn canonical_hash<N>(&self, root: &N) -> Result<CanonicalHash>
    where
        A: ChildAccessor<N>,
    {
        self.walk(root, &NodePath::root()).map(|(hash, _)| hash)
    }

    /// Shape hash of `node`'s top level, e.g. for a query pattern.
    ///
    /// Children are ignored entirely, so a pattern may carry an empty or
    /// placeholder child list.
    ///
    /// # Errors
    ///
    /// Payload extraction or encoding failures.
    pub fn shape_hash<N>(&self, node: &N) -> Result<ShapeHash>
    where
        A: ChildAccessor<N>,
    {
        let root = NodePath::root();
        let payload = self.accessor.payload(node)?;
        shape_hash(&self.hasher, &payload).map_err(|e| IndexError::malformed(&root, e.to_string()))
    }

    /// Post-order walk of the sub-tree at `origin` into a new staging set.
    pub(crate) fn walk<N>(
        &self,
        root: &N,
        origin: &NodePath,
    ) -> Result<(CanonicalHash, SubObjectMaps)>
    where
        A: ChildAccessor<N>,
    {
        self.check_depth(origin)?;
        let mut staging = SubObjectMaps::new();
        let mut path = origin.clone();
        let mut stack = vec![self.open(root, &path)?];
        let mut root_hash = None;

        while let Some(top) = stack.last_mut() {
            let children = top.children;
            if let Some(child) = children.get(top.next) {
                path.push(top.next);
                top.next += 1;
                self.check_depth(&path)?;
                let frame = self.open(child, &path)?;
                stack.push(frame);
                continue;
            }

            let Some(done) = stack.pop() else { break };
            let payload = self
                .accessor
                .payload(done.node)
                .map_err(|e| e.at(&path))?;
            let hash = self.finalize(
                payload,
                done.children.len(),
                done.hashes,
                &mut staging,
                &path,
            )?;
            if let Some(parent) = stack.last_mut() {
                parent.hashes.push(hash);
                path.pop();
            } else {
                root_hash = Some(hash);
            }
        }

        root_hash
            .map(|hash| (hash, staging))
            .ok_or_else(|| IndexError::malformed(origin, "traversal finished without a root"))
    }

    /// Canonicalize one node whose children are all finalized.
    ///
    /// Stores the truncated node, its shape membership, and one edge per
    /// distinct child.
    pub(crate) fn finalize(
        &self,
        payload: Payload,
        child_count: usize,
        child_hashes: Vec<CanonicalHash>,
        staging: &mut SubObjectMaps,
        path: &NodePath,
    ) -> Result<CanonicalHash> {
        let shape = shape_hash(&self.hasher, &payload)
            .map_err(|e| IndexError::malformed(path, e.to_string()))?;
        let node = truncate(payload, child_count, child_hashes)?;
        let record = node
            .record_bytes()
            .map_err(|e| IndexError::malformed(path, e.to_string()))?;
        let hash = canonical_hash_of_bytes(&self.hasher, &record);

        for child in node.children() {
            staging.add_edge(hash, *child);
        }
        if staging.intern(hash, node)? {
            trace!(hash = %hash.short_hex(), shape = %shape.short_hex(), %path, "interned");
        }
        staging.add_shape(shape, hash);
        Ok(hash)
    }

    pub(crate) fn check_depth(&self, path: &NodePath) -> Result<()> {
        if path.depth() > self.max_depth {
            return Err(IndexError::malformed(
                path,
                format!("depth limit {} exceeded", self.max_depth),
            ));
        }
        Ok(())
    }

    fn open<'n, N>(&self, node: &'n N, path: &NodePath) -> Result<Frame<'n, N>>
    where
        A: ChildAccessor<N>,
    {
        let children = self.accessor.children(node).map_err(|e| e.at(path))?;
        Ok(Frame {
            node,
            children,
            next: 0,
            hashes: Vec::with_capacity(children.len()),
        })
    }
}

/// Index `root` into a fresh map-set.
///
/// # Errors
///
/// Any [`IndexError`].
pub fn build_index<N, A, H>(root: &N, accessor: A, hasher: H) -> Result<SubObjectMaps>
where
    A: ChildAccessor<N>,
    H: NodeHasher,
{
    SubExpressionIndexer::new(accessor, hasher).build_index(root)
}

/// Index `root` into an existing map-set, returning the root's hash.
///
/// # Errors
///
/// Any [`IndexError`]; `maps` is unchanged on error.
pub fn build_index_into<N, A, H>(
    root: &N,
    accessor: A,
    hasher: H,
    maps: &mut SubObjectMaps,
) -> Result<CanonicalHash>
where
    A: ChildAccessor<N>,
    H: NodeHasher,
{
    SubExpressionIndexer::new(accessor, hasher).index_into(root, maps)
}
