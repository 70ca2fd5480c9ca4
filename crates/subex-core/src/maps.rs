// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The three interlinked indices produced by the indexer.
//!
//! # Canonical Representatives
//!
//! Each canonical hash maps to exactly one `Arc<TruncatedNode>`. Once a hash
//! is stored, that allocation is *the* representative for every structurally
//! equal sub-tree ever indexed into this map-set, across trees. Merging never
//! replaces an existing representative.
//!
//! # Determinism Invariant
//!
//! All maps are ordered; every iteration API returns results sorted by hash.
//! [`SubObjectMaps::digest`] is a pure function of the contents.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use blake3::Hasher;
use tracing::warn;

use crate::canonical::CanonError;
use crate::error::{IndexError, Result};
use crate::ident::{CanonicalHash, Hash, ShapeHash};
use crate::relation::RelationMap;
use crate::truncate::TruncatedNode;

static EMPTY: BTreeSet<CanonicalHash> = BTreeSet::new();

/// Entry counts of a map-set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Distinct canonical hashes in the store.
    pub nodes: usize,
    /// Distinct shape hashes.
    pub shapes: usize,
    /// Distinct parent/child edges.
    pub edges: usize,
}

/// What a [`SubObjectMaps::merge`] added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Store entries that were not present before.
    pub new_nodes: usize,
    /// `(shape, hash)` memberships that were not present before.
    pub new_shape_members: usize,
    /// Edges that were not present before.
    pub new_edges: usize,
}

impl MergeSummary {
    /// Returns `true` if the merge changed nothing.
    pub fn is_noop(&self) -> bool {
        self.new_nodes == 0 && self.new_shape_members == 0 && self.new_edges == 0
    }
}

/// Hash-consing table, shape groups, and parent/child relation.
#[derive(Clone, Debug, Default)]
pub struct SubObjectMaps {
    hash_to_truncated_object: BTreeMap<CanonicalHash, Arc<TruncatedNode>>,
    hash_no_children_to_hash: BTreeMap<ShapeHash, BTreeSet<CanonicalHash>>,
    parent_child_relation: RelationMap<CanonicalHash, CanonicalHash>,
}

impl SubObjectMaps {
    /// Create an empty map-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical representative stored under `hash`.
    pub fn resolve(&self, hash: &CanonicalHash) -> Option<&Arc<TruncatedNode>> {
        self.hash_to_truncated_object.get(hash)
    }

    /// Returns `true` if `hash` is in the canonical store.
    pub fn contains(&self, hash: &CanonicalHash) -> bool {
        self.hash_to_truncated_object.contains_key(hash)
    }

    /// Every canonical hash whose payload has shape `shape`.
    ///
    /// Empty for an unknown shape.
    pub fn lookup_by_shape(&self, shape: &ShapeHash) -> &BTreeSet<CanonicalHash> {
        self.hash_no_children_to_hash.get(shape).unwrap_or(&EMPTY)
    }

    /// Distinct children of `hash` (repeated identical children appear once).
    pub fn children_of(&self, hash: &CanonicalHash) -> &BTreeSet<CanonicalHash> {
        self.parent_child_relation
            .children_of(hash)
            .unwrap_or(&EMPTY)
    }

    /// Distinct parents of `hash` across everything indexed so far.
    pub fn parents_of(&self, hash: &CanonicalHash) -> &BTreeSet<CanonicalHash> {
        self.parent_child_relation
            .parents_of(hash)
            .unwrap_or(&EMPTY)
    }

    /// The parent/child relation.
    pub fn relation(&self) -> &RelationMap<CanonicalHash, CanonicalHash> {
        &self.parent_child_relation
    }

    /// Store entries, sorted by hash.
    pub fn nodes(&self) -> impl Iterator<Item = (&CanonicalHash, &Arc<TruncatedNode>)> {
        self.hash_to_truncated_object.iter()
    }

    /// Shape groups, sorted by shape hash.
    pub fn shapes(&self) -> impl Iterator<Item = (&ShapeHash, &BTreeSet<CanonicalHash>)> {
        self.hash_no_children_to_hash.iter()
    }

    /// Number of distinct canonical hashes.
    pub fn len(&self) -> usize {
        self.hash_to_truncated_object.len()
    }

    /// Returns `true` if nothing has been indexed.
    pub fn is_empty(&self) -> bool {
        self.hash_to_truncated_object.is_empty()
    }

    /// Entry counts for all three maps.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            nodes: self.hash_to_truncated_object.len(),
            shapes: self.hash_no_children_to_hash.len(),
            edges: self.parent_child_relation.len(),
        }
    }

    /// Store `node` under `hash` unless already present.
    ///
    /// Returns `true` for a new entry.
    pub(crate) fn intern(&mut self, hash: CanonicalHash, node: TruncatedNode) -> Result<bool> {
        if let Some(existing) = self.hash_to_truncated_object.get(&hash) {
            if !same_structure(existing, &node) {
                warn!(hash = %hash.short_hex(), "canonical hash collision");
                return Err(IndexError::HashCollision { hash });
            }
            return Ok(false);
        }
        self.hash_to_truncated_object.insert(hash, Arc::new(node));
        Ok(true)
    }

    pub(crate) fn add_shape(&mut self, shape: ShapeHash, hash: CanonicalHash) -> bool {
        self.hash_no_children_to_hash
            .entry(shape)
            .or_default()
            .insert(hash)
    }

    pub(crate) fn add_edge(&mut self, parent: CanonicalHash, child: CanonicalHash) -> bool {
        self.parent_child_relation.add_pair(parent, child)
    }

    /// Fold `incoming` into this map-set.
    ///
    /// Every incoming store entry is checked against existing entries before
    /// anything is written, so on error `self` is unchanged. Existing
    /// representatives are kept; only missing hashes take `incoming`'s
    /// allocation.
    ///
    /// # Errors
    ///
    /// [`IndexError::HashCollision`] if a hash is bound to different nodes
    /// on the two sides.
    pub fn merge(&mut self, incoming: SubObjectMaps) -> Result<MergeSummary> {
        for (hash, node) in &incoming.hash_to_truncated_object {
            if let Some(existing) = self.hash_to_truncated_object.get(hash) {
                if !Arc::ptr_eq(existing, node) && !same_structure(existing, node) {
                    warn!(hash = %hash.short_hex(), "canonical hash collision on merge");
                    return Err(IndexError::HashCollision { hash: *hash });
                }
            }
        }

        let mut summary = MergeSummary::default();
        for (hash, node) in incoming.hash_to_truncated_object {
            if let std::collections::btree_map::Entry::Vacant(slot) =
                self.hash_to_truncated_object.entry(hash)
            {
                slot.insert(node);
                summary.new_nodes += 1;
            }
        }
        for (shape, members) in incoming.hash_no_children_to_hash {
            let group = self.hash_no_children_to_hash.entry(shape).or_default();
            for hash in members {
                if group.insert(hash) {
                    summary.new_shape_members += 1;
                }
            }
        }
        summary.new_edges = self
            .parent_child_relation
            .extend(&incoming.parent_child_relation);
        Ok(summary)
    }

    /// Deterministic BLAKE3 digest of the whole map-set.
    ///
    /// Encodes, in order: the store (hash, then length-prefixed canonical
    /// record), the shape groups (shape, member count, members), and the
    /// edges (parent, child). Lengths and counts are little-endian `u64`.
    ///
    /// # Errors
    ///
    /// Propagates canonical encoding failures (not expected for entries the
    /// indexer stored).
    pub fn digest(&self) -> std::result::Result<Hash, CanonError> {
        let mut hasher = Hasher::new();
        hasher.update(b"subex:index:v1");

        hasher.update(&(self.hash_to_truncated_object.len() as u64).to_le_bytes());
        for (hash, node) in &self.hash_to_truncated_object {
            let record = node.record_bytes()?;
            hasher.update(hash.as_bytes());
            hasher.update(&(record.len() as u64).to_le_bytes());
            hasher.update(&record);
        }

        hasher.update(&(self.hash_no_children_to_hash.len() as u64).to_le_bytes());
        for (shape, members) in &self.hash_no_children_to_hash {
            hasher.update(shape.as_bytes());
            hasher.update(&(members.len() as u64).to_le_bytes());
            for hash in members {
                hasher.update(hash.as_bytes());
            }
        }

        hasher.update(&(self.parent_child_relation.len() as u64).to_le_bytes());
        for (parent, child) in self.parent_child_relation.iter() {
            hasher.update(parent.as_bytes());
            hasher.update(child.as_bytes());
        }
        Ok(hasher.finalize().into())
    }
}

/// Structural equality that also treats bit-identical NaN payloads as equal.
fn same_structure(a: &TruncatedNode, b: &TruncatedNode) -> bool {
    a == b
        || matches!(
            (a.record_bytes(), b.record_bytes()),
            (Ok(x), Ok(y)) if x == y
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ciborium::value::Value;

    use super::*;
    use crate::truncate::truncate;
    use crate::tree::Payload;

    fn node(kind: &str, children: Vec<CanonicalHash>) -> TruncatedNode {
        let payload =
            Payload::from_entries([(Value::Text("type".into()), Value::Text(kind.into()))])
                .unwrap();
        let n = children.len();
        truncate(payload, n, children).unwrap()
    }

    const H1: CanonicalHash = CanonicalHash([1; 32]);
    const H2: CanonicalHash = CanonicalHash([2; 32]);
    const S1: ShapeHash = ShapeHash([7; 32]);

    // ── 1. empty map-set invariants ─────────────────────────────────────

    #[test]
    fn empty_maps_answer_with_empty_sets() {
        let maps = SubObjectMaps::new();
        assert!(maps.is_empty());
        assert!(maps.resolve(&H1).is_none());
        assert!(maps.lookup_by_shape(&S1).is_empty());
        assert!(maps.children_of(&H1).is_empty());
        assert!(maps.parents_of(&H1).is_empty());
        assert_eq!(maps.stats(), IndexStats::default());
    }

    // ── 2. intern keeps the first representative ────────────────────────

    #[test]
    fn intern_is_idempotent_and_keeps_representative() {
        let mut maps = SubObjectMaps::new();
        assert!(maps.intern(H1, node("value", vec![])).unwrap());
        let first = Arc::clone(maps.resolve(&H1).unwrap());
        assert!(!maps.intern(H1, node("value", vec![])).unwrap());
        assert!(Arc::ptr_eq(&first, maps.resolve(&H1).unwrap()));
        assert_eq!(maps.len(), 1);
    }

    // ── 3. intern rejects a second node under the same hash ─────────────

    #[test]
    fn intern_detects_collision() {
        let mut maps = SubObjectMaps::new();
        maps.intern(H1, node("value", vec![])).unwrap();
        let err = maps.intern(H1, node("variable", vec![])).unwrap_err();
        assert_eq!(err, IndexError::HashCollision { hash: H1 });
    }

    // ── 4. merge keeps existing allocations ─────────────────────────────

    #[test]
    fn merge_keeps_existing_representatives() {
        let mut target = SubObjectMaps::new();
        target.intern(H1, node("value", vec![])).unwrap();
        let kept = Arc::clone(target.resolve(&H1).unwrap());

        let mut incoming = SubObjectMaps::new();
        incoming.intern(H1, node("value", vec![])).unwrap();
        incoming.intern(H2, node("neg", vec![H1])).unwrap();
        incoming.add_shape(S1, H1);
        incoming.add_edge(H2, H1);

        let summary = target.merge(incoming).unwrap();
        assert_eq!(
            summary,
            MergeSummary {
                new_nodes: 1,
                new_shape_members: 1,
                new_edges: 1
            }
        );
        assert!(Arc::ptr_eq(&kept, target.resolve(&H1).unwrap()));
        assert!(target.children_of(&H2).contains(&H1));
        assert!(target.parents_of(&H1).contains(&H2));
        assert!(target.lookup_by_shape(&S1).contains(&H1));
    }

    // ── 5. merge is atomic on collision ─────────────────────────────────

    #[test]
    fn merge_collision_leaves_target_unchanged() {
        let mut target = SubObjectMaps::new();
        target.intern(H1, node("value", vec![])).unwrap();
        let before = target.digest().unwrap();

        let mut incoming = SubObjectMaps::new();
        incoming.intern(H2, node("plus", vec![])).unwrap();
        incoming.intern(H1, node("variable", vec![])).unwrap();
        incoming.add_edge(H2, H1);

        assert!(target.merge(incoming).is_err());
        assert_eq!(target.digest().unwrap(), before);
        assert!(!target.contains(&H2));
    }

    // ── 6. digest tracks content ────────────────────────────────────────

    #[test]
    fn digest_is_content_addressed() {
        let mut a = SubObjectMaps::new();
        a.intern(H1, node("value", vec![])).unwrap();
        let mut b = SubObjectMaps::new();
        b.intern(H1, node("value", vec![])).unwrap();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        b.add_edge(H2, H1);
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    // ── 7. re-merging the same content is a no-op ───────────────────────

    #[test]
    fn merge_of_identical_content_is_noop() {
        let mut a = SubObjectMaps::new();
        a.intern(H1, node("value", vec![])).unwrap();
        a.add_shape(S1, H1);
        let copy = a.clone();
        assert!(a.merge(copy).unwrap().is_noop());
    }
}
