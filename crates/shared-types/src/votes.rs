//! LLR vote and record types.
//!
//! Votes are compact hashes of finality decisions, weighted by validator
//! stake; full records carry the complete block/epoch data a bootstrapping
//! node needs once the corresponding vote has reached quorum.

use crate::entities::{Block, SignedTransaction};
use crate::hashing::Hasher;
use crate::ids::{BlockHeight, Epoch, Hash, Signature, ValidatorId};
use crate::state::{BlockState, EpochState};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Votes for a run of consecutive blocks, one hash per height starting at
/// `start`. `epoch` names the validator set the voter belongs to and the
/// epoch the voted blocks reside in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockVotes {
    pub epoch: Epoch,
    pub start: BlockHeight,
    pub votes: Vec<Hash>,
}

impl BlockVotes {
    /// Last height covered, inclusive. Meaningless when `votes` is empty.
    pub fn last(&self) -> BlockHeight {
        self.start + self.votes.len() as BlockHeight - 1
    }

    /// The voted hash for `height`, if covered.
    pub fn vote_for(&self, height: BlockHeight) -> Option<&Hash> {
        if height < self.start {
            return None;
        }
        self.votes.get((height - self.start) as usize)
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u64(self.epoch).u64(self.start);
        h.u64(self.votes.len() as u64);
        for v in &self.votes {
            h.bytes(v);
        }
        h.finalize()
    }
}

/// Block votes together with the creator's signature.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedBlockVotes {
    pub creator: ValidatorId,
    pub votes: BlockVotes,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl SignedBlockVotes {
    /// The digest the creator signs.
    pub fn signing_hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u32(self.creator.0).bytes(&self.votes.hash());
        h.finalize()
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.bytes(&self.signing_hash()).bytes(&self.signature);
        h.finalize()
    }

    /// True when both bundles cover at least one common height but disagree
    /// on its hash.
    pub fn conflicts_with(&self, other: &SignedBlockVotes) -> bool {
        let lo = self.votes.start.max(other.votes.start);
        let hi = if self.votes.votes.is_empty() || other.votes.votes.is_empty() {
            return false;
        } else {
            self.votes.last().min(other.votes.last())
        };
        (lo..=hi).any(|height| self.votes.vote_for(height) != other.votes.vote_for(height))
    }
}

/// A vote for the sealed state of `epoch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EpochVote {
    pub epoch: Epoch,
    pub vote: Hash,
}

impl EpochVote {
    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u64(self.epoch).bytes(&self.vote);
        h.finalize()
    }
}

/// An epoch vote together with the creator's signature.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedEpochVote {
    pub creator: ValidatorId,
    pub vote: EpochVote,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl SignedEpochVote {
    pub fn signing_hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u32(self.creator.0).bytes(&self.vote.hash());
        h.finalize()
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.bytes(&self.signing_hash()).bytes(&self.signature);
        h.finalize()
    }
}

/// Complete data for one finalized block, importable without DAG replay.
///
/// Block votes vote on `FullBlockRecord::hash()`, so a record can be checked
/// against the decided result before being applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullBlockRecord {
    pub block: Block,
    pub txs: Vec<SignedTransaction>,
}

impl FullBlockRecord {
    pub fn height(&self) -> BlockHeight {
        self.block.height
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.bytes(&self.block.hash());
        h.u64(self.txs.len() as u64);
        for tx in &self.txs {
            h.bytes(&tx.hash());
        }
        h.finalize()
    }
}

/// Complete decided state for one sealed epoch.
///
/// Epoch votes vote on `FullEpochRecord::hash()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullEpochRecord {
    pub block_state: BlockState,
    pub epoch_state: EpochState,
}

impl FullEpochRecord {
    pub fn epoch(&self) -> Epoch {
        self.epoch_state.epoch
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.bytes(&self.block_state.hash()).bytes(&self.epoch_state.hash());
        h.finalize()
    }
}
