//! Ed25519 signing and verification over caller-supplied digests.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rayon::prelude::*;
use thiserror::Error;

/// Errors from signature verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Public key bytes do not decode to a valid curve point.
    #[error("malformed public key")]
    MalformedPublicKey,

    /// Signature does not verify against the key and digest.
    #[error("invalid signature")]
    InvalidSignature,
}

/// An Ed25519 keypair identifying a validator.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing: SigningKey::generate(&mut csprng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Test fixtures and genesis
    /// tooling derive validator keys this way.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    pub fn public(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// Sign a 32-byte digest.
    pub fn sign(&self, digest: &[u8; 32]) -> [u8; 64] {
        self.signing.sign(digest).to_bytes()
    }
}

/// Verify one signature over a 32-byte digest.
pub fn verify(pubkey: &[u8; 32], digest: &[u8; 32], signature: &[u8; 64]) -> Result<(), CryptoError> {
    let key = VerifyingKey::from_bytes(pubkey).map_err(|_| CryptoError::MalformedPublicKey)?;
    let sig = Signature::from_bytes(signature);
    key.verify_strict(digest, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Verify a batch of (pubkey, digest, signature) triples in parallel.
///
/// Returns the first failure by input order, or `Ok(())` when every
/// signature verifies.
pub fn verify_batch(items: &[([u8; 32], [u8; 32], [u8; 64])]) -> Result<(), CryptoError> {
    let failures: Vec<(usize, CryptoError)> = items
        .par_iter()
        .enumerate()
        .filter_map(|(i, (pk, digest, sig))| verify(pk, digest, sig).err().map(|e| (i, e)))
        .collect();
    match failures.into_iter().min_by_key(|(i, _)| *i) {
        Some((_, err)) => Err(err),
        None => Ok(()),
    }
}
