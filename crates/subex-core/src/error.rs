// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Indexing errors.
//!
//! None of these are retryable: indexing is a pure function of its input, so
//! running it again on the same tree fails the same way.

use thiserror::Error;

use crate::ident::CanonicalHash;
use crate::tree::NodePath;

/// Failure while indexing a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The input is not a well-formed tree: a node (or declared child) is not
    /// a conforming record, its payload cannot be canonically encoded, or the
    /// walk exceeded the configured depth limit.
    #[error("[SUBEX_MALFORMED_TREE] at {path}: {reason}")]
    MalformedTree {
        /// Location of the offending node.
        path: NodePath,
        /// Human-readable description.
        reason: String,
    },
    /// A node was truncated before all of its children were canonicalized.
    ///
    /// Signals a broken post-order invariant; unreachable through the
    /// indexer's own walk.
    #[error("[SUBEX_MISSING_CHILD_HASH] no canonical hash for child {position}")]
    MissingChildHash {
        /// Index of the first child without a hash.
        position: usize,
    },
    /// More child hashes were supplied than the node declares children.
    #[error("[SUBEX_EXTRA_CHILD_HASH] {found} child hashes for {expected} children")]
    ExtraChildHash {
        /// Declared child count.
        expected: usize,
        /// Hashes supplied.
        found: usize,
    },
    /// The configured children field is absent from a node.
    #[error("[SUBEX_CONFIG] children field `{field}` missing at {path}")]
    Config {
        /// Configured children field name.
        field: String,
        /// Location of the offending node.
        path: NodePath,
    },
    /// A digest is already bound to a structurally different truncated node.
    #[error("[SUBEX_HASH_COLLISION] {hash} is bound to a different node")]
    HashCollision {
        /// The colliding canonical hash.
        hash: CanonicalHash,
    },
}

impl IndexError {
    /// Build a [`IndexError::MalformedTree`] at `path`.
    pub fn malformed(path: &NodePath, reason: impl Into<String>) -> Self {
        Self::MalformedTree {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Re-anchor a location-bearing error at `path`.
    ///
    /// Accessors report errors relative to the node they were handed; the
    /// walk calls this to attach the node's position in the whole tree.
    #[must_use]
    pub fn at(self, path: &NodePath) -> Self {
        match self {
            Self::MalformedTree { reason, .. } => Self::MalformedTree {
                path: path.clone(),
                reason,
            },
            Self::Config { field, .. } => Self::Config {
                field,
                path: path.clone(),
            },
            other => other,
        }
    }
}

/// Convenience alias for indexing results.
pub type Result<T, E = IndexError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_rewrites_location_only_for_located_errors() {
        let here = NodePath::from(vec![0, 2]);
        let err = IndexError::malformed(&NodePath::root(), "bad").at(&here);
        assert_eq!(
            err,
            IndexError::MalformedTree {
                path: here.clone(),
                reason: "bad".into()
            }
        );

        let missing = IndexError::MissingChildHash { position: 1 };
        assert_eq!(missing.clone().at(&here), missing);
    }

    #[test]
    fn messages_carry_stable_codes() {
        let err = IndexError::Config {
            field: "children".into(),
            path: NodePath::from(vec![1]),
        };
        assert_eq!(
            err.to_string(),
            "[SUBEX_CONFIG] children field `children` missing at root/1"
        );
    }
}
