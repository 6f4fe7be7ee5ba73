// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{BuildHasherDefault, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelsError;

/// Size of a digest in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte digest identifying a transaction, a block or a proposal.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Wraps a raw digest.
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Returns the underlying digest bytes.
    pub const fn to_bytes(&self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// The all-zero digest, used as the "no proposal" sentinel.
    pub const fn zero() -> Self {
        Hash([0u8; HASH_SIZE])
    }

    /// Whether this is the all-zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }

    /// Short hex prefix used when logging.
    pub fn abridged(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abridged())
    }
}

impl FromStr for Hash {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ModelsError::HashParseError(e.to_string()))?;
        let digest: [u8; HASH_SIZE] = bytes
            .try_into()
            .map_err(|_| ModelsError::HashParseError(format!("expected {} bytes", HASH_SIZE)))?;
        Ok(Hash(digest))
    }
}

impl HashedKey for Hash {}

/// Marker for key types that already are uniformly distributed digests of at
/// least 8 bytes: hashing them again for table placement is wasted work.
pub trait HashedKey {}

/// A `Hasher` for [`HashedKey`] types that truncates the key to its first
/// 8 bytes instead of re-hashing it.
pub struct KeyHasher<T: HashedKey> {
    key: u64,
    marker: PhantomData<T>,
}

impl<T: HashedKey> Default for KeyHasher<T> {
    fn default() -> Self {
        KeyHasher {
            key: 0,
            marker: PhantomData,
        }
    }
}

impl<T: HashedKey> Hasher for KeyHasher<T> {
    #[inline]
    fn finish(&self) -> u64 {
        self.key
    }

    /// Keeps the leading 8 bytes of the written key.
    /// Panics if fed fewer than 8 bytes, which a [`HashedKey`] never is.
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        self.key = u64::from_ne_bytes(word);
    }
}

/// `BuildHasher` for [`KeyHasher`].
pub type BuildKeyHasher<T> = BuildHasherDefault<KeyHasher<T>>;

/// `HashMap` keyed by pre-hashed digests.
pub type HashedMap<K, V> = HashMap<K, V, BuildKeyHasher<K>>;

/// `HashSet` of pre-hashed digests.
pub type HashedSet<T> = HashSet<T, BuildKeyHasher<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_sentinel() {
        let h = Hash::from_bytes([0xAB; HASH_SIZE]);
        assert_eq!(Hash::from_str(&h.to_string()).unwrap(), h);
        assert!(!h.is_zero());
        assert!(Hash::zero().is_zero());
        assert_eq!(h.abridged(), "abababab");
    }

    #[test]
    fn hashed_map_lookup() {
        let mut map: HashedMap<Hash, u32> = HashedMap::default();
        let h = Hash::from_bytes([7; HASH_SIZE]);
        map.insert(h, 42);
        assert_eq!(map.get(&h), Some(&42));
    }
}
