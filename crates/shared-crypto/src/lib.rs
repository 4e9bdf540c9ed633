//! # shared-crypto
//!
//! Signing and hashing primitives for Quasar-DAG.
//!
//! Events, votes and misbehaviour-proof halves are signed with Ed25519 over
//! 32-byte Keccak digests computed by the caller. Batch verification fans
//! out over a rayon pool since signature checks dominate heavy validation.

pub mod hashing;
pub mod signing;

pub use hashing::keccak256;
pub use signing::{verify, verify_batch, CryptoError, Keypair};
