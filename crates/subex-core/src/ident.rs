// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hash identifiers and pluggable digest functions.
use blake3::Hasher;

/// Raw 256-bit digest produced by a [`NodeHasher`].
pub type Hash = [u8; 32];

/// Identity of a node's payload *and* the ordered canonical hashes of its
/// children.
///
/// Two sub-trees with equal payloads and equal ordered child hashes always
/// share a `CanonicalHash`; this is the structural-equality contract of the
/// whole index.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CanonicalHash(pub Hash);

/// Digest of a node's payload only (children excluded).
///
/// Groups every canonical hash that looks alike at the top level, which is
/// the primitive wildcard matching builds on.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ShapeHash(pub Hash);

macro_rules! hash_newtype_common {
    ($ty:ident) => {
        impl $ty {
            /// View the hash as a byte array.
            pub fn as_bytes(&self) -> &Hash {
                &self.0
            }

            /// Lowercase hex of the first 8 bytes, for log fields.
            pub fn short_hex(&self) -> String {
                hex::encode(&self.0[..8])
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    };
}

hash_newtype_common!(CanonicalHash);
hash_newtype_common!(ShapeHash);

/// Which family of digest is being computed.
///
/// Digests are domain-separated so a shape digest can never coincide with a
/// canonical digest of the same bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HashDomain {
    /// Truncated node record (payload plus ordered child hashes).
    Node,
    /// Payload-only projection.
    Shape,
}

impl HashDomain {
    /// Byte prefix mixed into every digest of this domain.
    pub const fn prefix(self) -> &'static [u8] {
        match self {
            Self::Node => b"subex:node:",
            Self::Shape => b"subex:shape:",
        }
    }
}

/// Deterministic digest over canonical record bytes.
///
/// Implementations must be pure functions of `(domain, bytes)`. Closures of
/// the shape `Fn(HashDomain, &[u8]) -> Hash` implement this trait, which is
/// handy for tests that want a deliberately weak digest.
pub trait NodeHasher {
    /// Digest `bytes` within `domain`.
    fn digest(&self, domain: HashDomain, bytes: &[u8]) -> Hash;
}

impl<F> NodeHasher for F
where
    F: Fn(HashDomain, &[u8]) -> Hash,
{
    fn digest(&self, domain: HashDomain, bytes: &[u8]) -> Hash {
        self(domain, bytes)
    }
}

/// Plain BLAKE3 with a domain prefix. The default digest.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl NodeHasher for Blake3Hasher {
    fn digest(&self, domain: HashDomain, bytes: &[u8]) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(domain.prefix());
        hasher.update(bytes);
        hasher.finalize().into()
    }
}

/// BLAKE3 in keyed mode.
///
/// Indices built with different keys never share hashes.
#[derive(Clone, Debug)]
pub struct KeyedBlake3Hasher {
    key: Hash,
}

impl KeyedBlake3Hasher {
    /// Create a keyed hasher.
    pub fn new(key: Hash) -> Self {
        Self { key }
    }
}

impl NodeHasher for KeyedBlake3Hasher {
    fn digest(&self, domain: HashDomain, bytes: &[u8]) -> Hash {
        let mut hasher = Hasher::new_keyed(&self.key);
        hasher.update(domain.prefix());
        hasher.update(bytes);
        hasher.finalize().into()
    }
}

/// Digest selected at runtime from configuration.
#[derive(Clone, Debug, Default)]
pub enum HashFunction {
    /// See [`Blake3Hasher`].
    #[default]
    Blake3,
    /// See [`KeyedBlake3Hasher`].
    Blake3Keyed(KeyedBlake3Hasher),
}

impl NodeHasher for HashFunction {
    fn digest(&self, domain: HashDomain, bytes: &[u8]) -> Hash {
        match self {
            Self::Blake3 => Blake3Hasher.digest(domain, bytes),
            Self::Blake3Keyed(keyed) => keyed.digest(domain, bytes),
        }
    }
}
