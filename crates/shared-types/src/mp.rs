//! Misbehaviour proofs: cryptographic evidence of validator equivocation.
//!
//! Each proof variant carries two signed statements that, taken together,
//! convict a validator of double-signing or of voting against a decided
//! result. Both halves are independently verifiable, so any node can check a
//! proof without trusting the accuser.

use crate::hashing::Hasher;
use crate::ids::{Epoch, EventSeq, Hash, Lamport, Signature, ValidatorId};
use crate::votes::{SignedBlockVotes, SignedEpochVote};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Compact signed statement of an event's identity.
///
/// `base_hash` commits to every event field outside the locator itself, so
/// two locators differing anywhere in content hash differently while still
/// sharing the (creator, epoch, seq) slot that defines a double-sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventLocator {
    pub base_hash: Hash,
    pub creator: ValidatorId,
    pub epoch: Epoch,
    pub seq: EventSeq,
    pub lamport: Lamport,
    pub payload_hash: Hash,
}

impl EventLocator {
    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.bytes(&self.base_hash)
            .u32(self.creator.0)
            .u64(self.epoch)
            .u32(self.seq)
            .u64(self.lamport)
            .bytes(&self.payload_hash);
        h.finalize()
    }

    /// Two locators occupy the same slot when the same creator produced both
    /// for the same (epoch, seq).
    pub fn same_slot(&self, other: &EventLocator) -> bool {
        self.creator == other.creator && self.epoch == other.epoch && self.seq == other.seq
    }
}

/// A locator together with the creator's signature over its hash.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedEventLocator {
    pub locator: EventLocator,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// Evidence of validator equivocation or fraudulent voting.
///
/// A proof is only a crime when both halves are properly signed by the same
/// creator, reference the same logical slot, and conflict in their claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MisbehaviourProof {
    /// Two events from the same creator occupying the same (epoch, seq) slot.
    EventsDoublesign {
        a: SignedEventLocator,
        b: SignedEventLocator,
    },
    /// Two block-vote bundles from the same creator voting differently for
    /// an overlapping block range.
    BlockVoteDoublesign {
        a: SignedBlockVotes,
        b: SignedBlockVotes,
    },
    /// Two validators voting for the same block hash that contradicts the
    /// locally decided result.
    WrongBlockVote {
        a: SignedBlockVotes,
        b: SignedBlockVotes,
    },
    /// Two epoch votes from the same creator for the same epoch with
    /// different hashes.
    EpochVoteDoublesign {
        a: SignedEpochVote,
        b: SignedEpochVote,
    },
    /// Two validators voting for the same epoch hash that contradicts the
    /// locally decided result.
    WrongEpochVote {
        a: SignedEpochVote,
        b: SignedEpochVote,
    },
}

impl MisbehaviourProof {
    /// The earliest epoch this proof refers to; the liability window is
    /// measured from here.
    pub fn epoch(&self) -> Epoch {
        match self {
            Self::EventsDoublesign { a, b } => a.locator.epoch.min(b.locator.epoch),
            Self::BlockVoteDoublesign { a, b } | Self::WrongBlockVote { a, b } => {
                a.votes.epoch.min(b.votes.epoch)
            }
            Self::EpochVoteDoublesign { a, b } | Self::WrongEpochVote { a, b } => {
                a.vote.epoch.min(b.vote.epoch)
            }
        }
    }

    /// Validators accused by this proof.
    pub fn accused(&self) -> Vec<ValidatorId> {
        match self {
            Self::EventsDoublesign { a, .. } => vec![a.locator.creator],
            Self::BlockVoteDoublesign { a, .. } => vec![a.creator],
            Self::WrongBlockVote { a, b } => vec![a.creator, b.creator],
            Self::EpochVoteDoublesign { a, .. } => vec![a.creator],
            Self::WrongEpochVote { a, b } => vec![a.creator, b.creator],
        }
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        match self {
            Self::EventsDoublesign { a, b } => {
                h.u8(0)
                    .bytes(&a.locator.hash())
                    .bytes(&a.signature)
                    .bytes(&b.locator.hash())
                    .bytes(&b.signature);
            }
            Self::BlockVoteDoublesign { a, b } => {
                h.u8(1).bytes(&a.hash()).bytes(&b.hash());
            }
            Self::WrongBlockVote { a, b } => {
                h.u8(2).bytes(&a.hash()).bytes(&b.hash());
            }
            Self::EpochVoteDoublesign { a, b } => {
                h.u8(3).bytes(&a.hash()).bytes(&b.hash());
            }
            Self::WrongEpochVote { a, b } => {
                h.u8(4).bytes(&a.hash()).bytes(&b.hash());
            }
        }
        h.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(creator: u32, epoch: Epoch, seq: EventSeq, lamport: Lamport) -> EventLocator {
        EventLocator {
            base_hash: [creator as u8; 32],
            creator: ValidatorId(creator),
            epoch,
            seq,
            lamport,
            payload_hash: [0u8; 32],
        }
    }

    #[test]
    fn test_same_slot() {
        let a = locator(1, 2, 3, 10);
        let mut b = locator(1, 2, 3, 11);
        assert!(a.same_slot(&b));
        b.creator = ValidatorId(2);
        assert!(!a.same_slot(&b));
    }

    #[test]
    fn test_locator_hash_commits_to_lamport() {
        let a = locator(1, 2, 3, 10);
        let b = locator(1, 2, 3, 11);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_proof_epoch_is_earliest() {
        let a = SignedEventLocator {
            locator: locator(1, 5, 1, 1),
            signature: [0u8; 64],
        };
        let b = SignedEventLocator {
            locator: locator(1, 3, 1, 1),
            signature: [0u8; 64],
        };
        let mp = MisbehaviourProof::EventsDoublesign { a, b };
        assert_eq!(mp.epoch(), 3);
    }
}
