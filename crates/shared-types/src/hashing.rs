//! Deterministic field-by-field hashing for domain entities.
//!
//! All consensus-visible hashes are built by feeding fields to a Keccak-256
//! hasher in declaration order. No serialization framework sits between the
//! fields and the digest, so the encodings cannot drift between versions.

use crate::ids::Hash;
use sha3::{Digest, Keccak256};

/// Keccak-256 over a single byte slice.
pub fn keccak256(bytes: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Incremental Keccak-256 with fixed-width integer encoding helpers.
#[derive(Default)]
pub struct Hasher {
    inner: Keccak256,
}

impl Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.update(bytes);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.inner.update([v]);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.inner.update(v.to_le_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.inner.update(v.to_le_bytes());
        self
    }

    pub fn u256(&mut self, v: &primitive_types::U256) -> &mut Self {
        let mut buf = [0u8; 32];
        v.to_big_endian(&mut buf);
        self.inner.update(buf);
        self
    }

    /// Length-prefixed variable slice, so adjacent fields cannot alias.
    pub fn var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.u64(bytes.len() as u64);
        self.inner.update(bytes);
        self
    }

    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}
