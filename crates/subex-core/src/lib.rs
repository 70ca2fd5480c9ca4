// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hash-consed sub-expression index over labeled trees.
//!
//! `subex-core` walks a tree bottom-up and produces three interlinked maps
//! ([`SubObjectMaps`]):
//!
//! - a canonical store from [`CanonicalHash`] to [`TruncatedNode`] (a node
//!   with its children replaced by their hashes), holding one shared
//!   representative per distinct sub-tree;
//! - shape groups from [`ShapeHash`] (payload only, children ignored) to
//!   every canonical hash with that top-level shape, the lookup wildcard
//!   matching starts from;
//! - a parent/child [`RelationMap`] over canonical hashes.
//!
//! Structurally equal sub-trees collapse to one hash and one stored object,
//! within one tree and across every tree indexed into the same maps. This is
//! the substrate a term-rewriting or equality-saturation engine builds on;
//! rule search and application live elsewhere.
//!
//! # Hash Domain Policy
//!
//! Payloads are CBOR records encoded canonically (sorted keys, shortest
//! numbers) before hashing, so field order never matters and child order
//! always does. Canonical and shape digests use separate domain prefixes.
//!
//! # Atomicity
//!
//! Every indexing call builds into a staging map-set and merges only on
//! success. A failed call never leaves partial entries behind.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Canonical CBOR encoding of payload records.
pub mod canonical;
/// Indexer configuration (children field, digest, limits).
pub mod config;
mod error;
mod ident;
mod indexer;
mod maps;
mod parallel;
mod relation;
mod tree;
mod truncate;

pub use canonical::{encode_value, CanonError};
pub use config::{ConfigError, HashConfig, IndexerConfig};
pub use error::{IndexError, Result};
pub use ident::{
    Blake3Hasher, CanonicalHash, Hash, HashDomain, HashFunction, KeyedBlake3Hasher, NodeHasher,
    ShapeHash,
};
pub use indexer::{build_index, build_index_into, SubExpressionIndexer, DEFAULT_MAX_DEPTH};
pub use maps::{IndexStats, MergeSummary, SubObjectMaps};
pub use parallel::SharedSubObjectMaps;
pub use relation::RelationMap;
pub use tree::{
    to_tree_value, ChildAccessor, FieldAccessor, NodePath, Payload, DEFAULT_CHILDREN_FIELD,
};
pub use truncate::{canonical_hash, shape_hash, truncate, TruncatedNode};

/// Re-export of the CBOR value type used for tree records.
pub use ciborium::value::Value;
