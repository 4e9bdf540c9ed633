//! Primitive identifiers and scalar aliases used across all subsystems.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Epoch number. An epoch is a bounded period with a fixed validator set.
pub type Epoch = u64;

/// Consensus round marker assigned by the ordering engine.
pub type Frame = u32;

/// Logical clock value. Strictly greater than the Lamport time of every parent.
pub type Lamport = u64;

/// Per-creator, per-epoch monotonic sequence number, starting at 1.
pub type EventSeq = u32;

/// Monotonic, consensus-agreed block index.
pub type BlockHeight = u64;

/// Nanoseconds since the Unix epoch.
pub type Timestamp = u64;

/// Nanoseconds per second, for gas power allocation arithmetic.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Compact validator identity within an epoch's validator set.
///
/// Stable across epochs for the same staker; the epoch's [`crate::ValidatorSet`]
/// maps it to a public key and a stake weight.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ValidatorId(pub u32);

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-derived identifier of a DAG event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct EventId(pub Hash);

impl EventId {
    pub const ZERO: EventId = EventId([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event:")?;
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
