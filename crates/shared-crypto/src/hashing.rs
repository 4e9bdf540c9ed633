//! Keccak-256 convenience wrapper.

use sha3::{Digest, Keccak256};

/// Keccak-256 over a byte slice.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
