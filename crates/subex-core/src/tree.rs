// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node access: payload projection and the configurable children field.
//!
//! The indexer never inspects a node directly. It asks a [`ChildAccessor`]
//! for two independent projections of the same node: the payload (every
//! field except the children) and the ordered child list. The default
//! accessor, [`FieldAccessor`], reads CBOR records and finds the children
//! under a field name chosen at runtime.

use std::fmt;

use ciborium::value::Value;
use serde::Serialize;

use crate::canonical::{sort_entries, CanonError};
use crate::error::{IndexError, Result};

/// Default name of the field holding a node's ordered children.
pub const DEFAULT_CHILDREN_FIELD: &str = "children";

/// Position of a node relative to the traversal root, as child indices.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The traversal root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Child indices from the root down to this node.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of edges between the root and this node.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path of this node's `index`-th child.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(index);
        next
    }

    pub(crate) fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// Payload-only projection of a node: its record fields minus the children.
///
/// Entries are kept in canonical key order, so two payloads compare equal
/// exactly when they encode (and therefore hash) identically, modulo float
/// NaN payloads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
    entries: Vec<(Value, Value)>,
}

impl Payload {
    /// Build a payload from record entries in any order.
    ///
    /// # Errors
    ///
    /// Fails if two entries share a key or an entry cannot be canonically
    /// encoded.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Value, Value)>,
    ) -> std::result::Result<Self, CanonError> {
        let entries = sort_entries(entries)?
            .into_iter()
            .map(|(_, k, v)| (k, v))
            .collect();
        Ok(Self { entries })
    }

    /// Entries in canonical key order.
    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    /// Look up a text-keyed field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` for a payload with no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The payload as a CBOR map.
    pub fn to_value(&self) -> Value {
        Value::Map(self.entries.clone())
    }
}

/// Reads the two projections the indexer needs from a caller's node type.
///
/// Errors may carry [`NodePath::root`] as their location; the walk re-anchors
/// them at the node's real position.
pub trait ChildAccessor<N> {
    /// Every field of `node` except its children.
    fn payload(&self, node: &N) -> Result<Payload>;

    /// The ordered children of `node` (empty for leaves).
    fn children<'n>(&self, node: &'n N) -> Result<&'n [N]>;
}

impl<N, A> ChildAccessor<N> for &A
where
    A: ChildAccessor<N> + ?Sized,
{
    fn payload(&self, node: &N) -> Result<Payload> {
        (**self).payload(node)
    }

    fn children<'n>(&self, node: &'n N) -> Result<&'n [N]> {
        (**self).children(node)
    }
}

/// Accessor for CBOR records whose children live under a named field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldAccessor {
    children_field: String,
}

impl FieldAccessor {
    /// Accessor reading children from `children_field`.
    pub fn new(children_field: impl Into<String>) -> Self {
        Self {
            children_field: children_field.into(),
        }
    }

    /// Configured children field name.
    pub fn children_field(&self) -> &str {
        &self.children_field
    }

    fn entries<'n>(node: &'n Value) -> Result<&'n [(Value, Value)]> {
        match node {
            Value::Map(entries) => Ok(entries),
            other => Err(IndexError::malformed(
                &NodePath::root(),
                format!("node is not a record (found {})", kind_of(other)),
            )),
        }
    }

    fn is_children_key(&self, key: &Value) -> bool {
        key.as_text() == Some(self.children_field.as_str())
    }
}

impl Default for FieldAccessor {
    fn default() -> Self {
        Self::new(DEFAULT_CHILDREN_FIELD)
    }
}

impl ChildAccessor<Value> for FieldAccessor {
    fn payload(&self, node: &Value) -> Result<Payload> {
        let entries = Self::entries(node)?;
        Payload::from_entries(
            entries
                .iter()
                .filter(|(k, _)| !self.is_children_key(k))
                .cloned(),
        )
        .map_err(|e| IndexError::malformed(&NodePath::root(), e.to_string()))
    }

    fn children<'n>(&self, node: &'n Value) -> Result<&'n [Value]> {
        let entries = Self::entries(node)?;
        match entries.iter().find(|(k, _)| self.is_children_key(k)) {
            Some((_, Value::Array(items))) => Ok(items),
            Some((_, other)) => Err(IndexError::malformed(
                &NodePath::root(),
                format!(
                    "children field `{}` is not a list (found {})",
                    self.children_field,
                    kind_of(other)
                ),
            )),
            None => Err(IndexError::Config {
                field: self.children_field.clone(),
                path: NodePath::root(),
            }),
        }
    }
}

/// Convert any serde-serializable tree into a CBOR record tree.
///
/// # Errors
///
/// Returns [`IndexError::MalformedTree`] if serialization fails.
pub fn to_tree_value<T>(tree: &T) -> Result<Value>
where
    T: Serialize + ?Sized,
{
    Value::serialized(tree).map_err(|e| IndexError::malformed(&NodePath::root(), e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "bytes",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(_, _) => "tag",
        Value::Array(_) => "list",
        Value::Map(_) => "record",
        _ => "unknown",
    }
}
