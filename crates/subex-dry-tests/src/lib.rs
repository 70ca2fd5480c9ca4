// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test fixtures for subex crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`alg`] - Algebra-expression record builders (`plus(value(1), value(2))`)
//! - [`hashers`] - Deliberately weak digests for collision tests
//! - [`random`] - Deterministic PRNG and random tree generator
//! - [`strategies`] - Proptest strategies over record trees

pub mod alg;
pub mod hashers;
pub mod random;
pub mod strategies;

pub use alg::{divide, equals, minus, op, plus, times, value, variable, AlgAtom, AlgExpr, AlgKind};
pub use hashers::{prefix_hasher, zero_hasher};
pub use random::{random_tree, XorShift64};
pub use strategies::arb_tree;
