// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Proptest strategies over algebra record trees.

use ciborium::value::Value;
use proptest::prelude::*;

use crate::alg::{op, value, variable};

/// Algebra trees up to `depth` levels with at most 3 children per operator.
///
/// Small leaf alphabet so shared sub-trees show up often.
pub fn arb_tree(depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        (0i64..4).prop_map(value),
        prop::sample::select(vec!["x", "y"]).prop_map(variable),
    ];
    leaf.prop_recursive(depth, 64, 3, |inner| {
        (
            prop::sample::select(vec!["plus", "times", "minus", "equals"]),
            prop::collection::vec(inner, 0..=3),
        )
            .prop_map(|(kind, children)| op(kind, children))
    })
}
