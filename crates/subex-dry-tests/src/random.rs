// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic random trees.

use ciborium::value::Value;

use crate::alg::{op, value, variable};

/// Tiny deterministic RNG (xorshift64*) so tests don't need `rand`.
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new PRNG with the given seed (0 is replaced with 1).
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next value in the xorshift64* sequence.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// A value in `[0, upper)`; modulo bias is fine for tests.
    #[allow(clippy::cast_possible_truncation)]
    pub fn gen_range_usize(&mut self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        (self.next_u64() % upper as u64) as usize
    }
}

const OPS: [&str; 5] = ["plus", "times", "minus", "divide", "equals"];
const VARS: [&str; 3] = ["x", "y", "z"];

/// Random algebra tree at most `depth` levels deep with up to `fanout`
/// children per operator.
///
/// Leaves draw from a small alphabet (`0..4`, `x`, `y`, `z`) so repeated
/// sub-trees are common.
pub fn random_tree(rng: &mut XorShift64, depth: usize, fanout: usize) -> Value {
    if depth == 0 || rng.gen_range_usize(4) == 0 {
        return if rng.gen_range_usize(2) == 0 {
            value(i64::try_from(rng.gen_range_usize(4)).unwrap_or_default())
        } else {
            variable(VARS[rng.gen_range_usize(VARS.len())])
        };
    }
    let arity = 1 + rng.gen_range_usize(fanout.max(1));
    let children = (0..arity)
        .map(|_| random_tree(rng, depth - 1, fanout))
        .collect();
    op(OPS[rng.gen_range_usize(OPS.len())], children)
}
