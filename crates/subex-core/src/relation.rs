// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Many-to-many relation between two identifier domains.
//!
//! Edges form a set, not a multiset: adding an existing pair is a no-op.
//! Both directions are indexed so either side can be queried in
//! logarithmic time. Iteration is sorted.

use std::collections::{BTreeMap, BTreeSet};

/// Set of `(left, right)` edges, indexed in both directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationMap<A, B> {
    forward: BTreeMap<A, BTreeSet<B>>,
    backward: BTreeMap<B, BTreeSet<A>>,
    edges: usize,
}

impl<A, B> Default for RelationMap<A, B> {
    fn default() -> Self {
        Self {
            forward: BTreeMap::new(),
            backward: BTreeMap::new(),
            edges: 0,
        }
    }
}

impl<A, B> RelationMap<A, B>
where
    A: Ord + Copy,
    B: Ord + Copy,
{
    /// Create an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the edge `(a, b)`. Returns `true` if it was not already present.
    pub fn add_pair(&mut self, a: A, b: B) -> bool {
        if !self.forward.entry(a).or_default().insert(b) {
            return false;
        }
        self.backward.entry(b).or_default().insert(a);
        self.edges += 1;
        true
    }

    /// Returns `true` if the edge `(a, b)` is present.
    pub fn contains(&self, a: &A, b: &B) -> bool {
        self.forward.get(a).is_some_and(|set| set.contains(b))
    }

    /// Every `b` related to `a`; `None` if `a` has no edges.
    pub fn right_of(&self, a: &A) -> Option<&BTreeSet<B>> {
        self.forward.get(a)
    }

    /// Every `a` related to `b`; `None` if `b` has no edges.
    pub fn left_of(&self, b: &B) -> Option<&BTreeSet<A>> {
        self.backward.get(b)
    }

    /// Number of distinct edges.
    pub fn len(&self) -> usize {
        self.edges
    }

    /// Returns `true` if no edges are recorded.
    pub fn is_empty(&self) -> bool {
        self.edges == 0
    }

    /// All edges, sorted by `(a, b)`.
    pub fn iter(&self) -> impl Iterator<Item = (A, B)> + '_ {
        self.forward
            .iter()
            .flat_map(|(a, set)| set.iter().map(move |b| (*a, *b)))
    }

    /// Add every edge of `other`. Returns the number of new edges.
    pub fn extend(&mut self, other: &Self) -> usize {
        other
            .iter()
            .filter(|(a, b)| self.add_pair(*a, *b))
            .count()
    }
}

impl<T> RelationMap<T, T>
where
    T: Ord + Copy,
{
    /// Children of `parent` when the relation links parents to children.
    pub fn children_of(&self, parent: &T) -> Option<&BTreeSet<T>> {
        self.right_of(parent)
    }

    /// Parents of `child` when the relation links parents to children.
    pub fn parents_of(&self, child: &T) -> Option<&BTreeSet<T>> {
        self.left_of(child)
    }
}
