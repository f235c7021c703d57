//! Hashers and hash containers. The `std-hash` feature swaps `ahash` and
//! `hashbrown` for the standard library implementations.

use core::hash::Hash;
use std::hash::Hasher;

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}

#[cfg(feature = "std-hash")]
pub mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod default {
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// Hash a single value with whichever hasher the `std-hash` feature selects.
#[inline]
pub fn hash_one<T: Hash + ?Sized>(v: &T) -> u64 {
    let mut h = default::new();
    v.hash(&mut h);
    h.finish()
}

/// Incremental builder for structural keys.
///
/// Segments are fed in order; two builders fed the same segments produce the
/// same key within one process.
pub(crate) struct KeyHasher {
    inner: default::DefaultHasher,
}

impl KeyHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: default::new(),
        }
    }

    pub(crate) fn write<T: Hash + ?Sized>(&mut self, segment: &T) {
        segment.hash(&mut self.inner);
    }

    pub(crate) fn finish(&self) -> u64 {
        self.inner.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_one_accepts_unsized_values() {
        let text = String::from("<p>hi</p>");
        assert_eq!(hash_one("<p>hi</p>"), hash_one(text.as_str()));
        assert_eq!(hash_one(&[1u8, 2, 3][..]), hash_one(&[1u8, 2, 3][..]));
    }
}
