// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deliberately weak digests.
//!
//! Real indices use BLAKE3; these exist to force collisions so tests can
//! observe how the index reacts to them.

use subex_core::{Hash, HashDomain};

/// Every input digests to zero.
pub fn zero_hasher() -> impl Fn(HashDomain, &[u8]) -> Hash + Clone + Send + Sync {
    |_domain: HashDomain, _bytes: &[u8]| [0u8; 32]
}

/// Domain-separated BLAKE3 truncated to its first `keep` bytes (rest zero).
///
/// `keep = 1` collides after a few hundred distinct records.
pub fn prefix_hasher(keep: usize) -> impl Fn(HashDomain, &[u8]) -> Hash + Clone + Send + Sync {
    move |domain: HashDomain, bytes: &[u8]| {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.prefix());
        hasher.update(bytes);
        let full: Hash = hasher.finalize().into();
        let mut out = [0u8; 32];
        let keep = keep.min(32);
        out[..keep].copy_from_slice(&full[..keep]);
        out
    }
}
