// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Truncated nodes and the two digests derived from them.
//!
//! A [`TruncatedNode`] is a node with its children replaced by their
//! canonical hashes: one level of indirection instead of a recursive
//! structure. Its canonical hashing unit is the CBOR array
//! `[payload_map, [child_hash_bytes, ...]]`, so field order inside the
//! payload never matters and child order always does. The shape digest
//! covers `payload_map` alone, in a separate hash domain.

use ciborium::value::Value;

use crate::canonical::{encode_value, CanonError};
use crate::error::{IndexError, Result};
use crate::ident::{CanonicalHash, HashDomain, NodeHasher, ShapeHash};
use crate::tree::Payload;

/// A node whose children have been replaced by their canonical hashes.
#[derive(Clone, Debug, PartialEq)]
pub struct TruncatedNode {
    payload: Payload,
    children: Vec<CanonicalHash>,
}

impl TruncatedNode {
    /// Payload-only projection.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Canonical hashes of the children, in original order (repeats kept).
    pub fn children(&self) -> &[CanonicalHash] {
        &self.children
    }

    /// Returns `true` when the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The canonical hashing unit: `[payload_map, [child_hash_bytes...]]`.
    pub fn record(&self) -> Value {
        Value::Array(vec![
            self.payload.to_value(),
            Value::Array(
                self.children
                    .iter()
                    .map(|h| Value::Bytes(h.as_bytes().to_vec()))
                    .collect(),
            ),
        ])
    }

    /// Canonical encoding of [`record`](Self::record).
    ///
    /// # Errors
    ///
    /// Propagates canonical encoding failures of the payload.
    pub fn record_bytes(&self) -> std::result::Result<Vec<u8>, CanonError> {
        encode_value(&self.record())
    }

    /// Render as a record shaped like the source node, with the children
    /// field holding hash byte strings.
    pub fn to_value(&self, children_field: &str) -> Value {
        let mut entries = self.payload.entries().to_vec();
        entries.push((
            Value::Text(children_field.to_owned()),
            Value::Array(
                self.children
                    .iter()
                    .map(|h| Value::Bytes(h.as_bytes().to_vec()))
                    .collect(),
            ),
        ));
        Value::Map(entries)
    }
}

/// Replace a node's children with their already-computed canonical hashes.
///
/// `child_count` is the number of children the node declares; `child_hashes`
/// holds the hashes known so far, in order. Never inspects grandchildren.
///
/// # Errors
///
/// [`IndexError::MissingChildHash`] if fewer hashes than children are known,
/// meaning a parent was visited before all of its children;
/// [`IndexError::ExtraChildHash`] if more hashes than children are given.
pub fn truncate(
    payload: Payload,
    child_count: usize,
    child_hashes: Vec<CanonicalHash>,
) -> Result<TruncatedNode> {
    if child_hashes.len() < child_count {
        return Err(IndexError::MissingChildHash {
            position: child_hashes.len(),
        });
    }
    if child_hashes.len() > child_count {
        return Err(IndexError::ExtraChildHash {
            expected: child_count,
            found: child_hashes.len(),
        });
    }
    Ok(TruncatedNode {
        payload,
        children: child_hashes,
    })
}

/// Digest of already-encoded record bytes in the node domain.
pub fn canonical_hash_of_bytes<H: NodeHasher + ?Sized>(hasher: &H, bytes: &[u8]) -> CanonicalHash {
    CanonicalHash(hasher.digest(HashDomain::Node, bytes))
}

/// Canonical hash of a truncated node.
///
/// # Errors
///
/// Propagates canonical encoding failures of the payload.
pub fn canonical_hash<H: NodeHasher + ?Sized>(
    hasher: &H,
    node: &TruncatedNode,
) -> std::result::Result<CanonicalHash, CanonError> {
    Ok(canonical_hash_of_bytes(hasher, &node.record_bytes()?))
}

/// Shape hash of a payload-only projection.
///
/// # Errors
///
/// Propagates canonical encoding failures of the payload.
pub fn shape_hash<H: NodeHasher + ?Sized>(
    hasher: &H,
    payload: &Payload,
) -> std::result::Result<ShapeHash, CanonError> {
    let bytes = encode_value(&payload.to_value())?;
    Ok(ShapeHash(hasher.digest(HashDomain::Shape, &bytes)))
}
