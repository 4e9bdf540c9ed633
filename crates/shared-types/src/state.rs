//! Decided consensus state, versioned per block and per epoch.
//!
//! Exactly one [`BlockState`] and one [`EpochState`] are current at any time.
//! Both are mutated only inside the finalization callbacks under the engine
//! lock; readers receive immutable snapshots.

use crate::hashing::Hasher;
use crate::ids::{BlockHeight, Epoch, EventId, Hash, Timestamp, ValidatorId};
use crate::validators::ValidatorSet;
use serde::{Deserialize, Serialize};

/// Block-scoped counters for one validator, indexed in parallel with the
/// epoch's validator set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidatorBlockState {
    /// Last event connected from this validator (fork-agnostic).
    pub last_event: Option<EventId>,
    /// Claimed creation time of the validator's most recent confirmed event.
    pub last_online: Timestamp,
    /// Accrued online time within the current epoch, in nanoseconds.
    pub uptime: u64,
    /// Gas power refunded for under-used transaction gas, paid out at the
    /// epoch seal.
    pub gas_refund: u64,
    /// Sum of gas actually used by transactions this validator originated;
    /// drives reward share.
    pub origination_score: u64,
}

impl ValidatorBlockState {
    fn feed(&self, h: &mut Hasher) {
        match &self.last_event {
            Some(id) => h.u8(1).bytes(id.as_bytes()),
            None => h.u8(0),
        };
        h.u64(self.last_online)
            .u64(self.uptime)
            .u64(self.gas_refund)
            .u64(self.origination_score);
    }
}

/// Mutable decided state scoped to the latest block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockState {
    pub last_block: BlockHeight,
    pub last_block_time: Timestamp,
    /// Blocks finalized within the current epoch.
    pub epoch_blocks: u64,
    /// State root after the last finalized block.
    pub final_state_root: Hash,
    /// Per-validator counters, same order as the epoch's validator set.
    pub validators: Vec<ValidatorBlockState>,
    /// Validators convicted by a misbehaviour proof this epoch; dropped from
    /// the set at the next seal.
    pub cheaters: Vec<ValidatorId>,
}

impl BlockState {
    /// Fresh per-validator counters for a new epoch's set.
    pub fn on_new_epoch(&self, validators: usize) -> BlockState {
        BlockState {
            last_block: self.last_block,
            last_block_time: self.last_block_time,
            epoch_blocks: 0,
            final_state_root: self.final_state_root,
            validators: vec![ValidatorBlockState::default(); validators],
            cheaters: Vec::new(),
        }
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u64(self.last_block)
            .u64(self.last_block_time)
            .u64(self.epoch_blocks)
            .bytes(&self.final_state_root);
        h.u64(self.validators.len() as u64);
        for v in &self.validators {
            v.feed(&mut h);
        }
        h.u64(self.cheaters.len() as u64);
        for c in &self.cheaters {
            h.u32(c.0);
        }
        h.finalize()
    }
}

/// Mutable decided state scoped to the current epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EpochState {
    pub epoch: Epoch,
    /// Time the epoch started: the sealing atropos' median time.
    pub epoch_start: Timestamp,
    pub prev_epoch_start: Timestamp,
    /// The active validator set. Epoch sealing is the only operation that
    /// may swap this.
    pub validators: ValidatorSet,
}

impl EpochState {
    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u64(self.epoch)
            .u64(self.epoch_start)
            .u64(self.prev_epoch_start)
            .bytes(&self.validators.hash());
        h.finalize()
    }
}

/// Watermarks for the asynchronous LLR track.
///
/// Each pointer names the first index not yet decided/filled, with no gaps
/// below it. Mutated only through the store's guarded read-modify-write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlrState {
    pub lowest_block_to_decide: BlockHeight,
    pub lowest_block_to_fill: BlockHeight,
    pub lowest_epoch_to_decide: Epoch,
    pub lowest_epoch_to_fill: Epoch,
}

impl Default for LlrState {
    fn default() -> Self {
        Self {
            lowest_block_to_decide: 1,
            lowest_block_to_fill: 1,
            lowest_epoch_to_decide: 1,
            lowest_epoch_to_fill: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::Validator;

    #[test]
    fn test_block_state_hash_tracks_counters() {
        let mut bs = BlockState::default();
        bs.validators = vec![ValidatorBlockState::default(); 2];
        let h1 = bs.hash();
        bs.validators[1].uptime += 5;
        assert_ne!(h1, bs.hash());
    }

    #[test]
    fn test_on_new_epoch_resets_epoch_scoped_fields() {
        let mut bs = BlockState {
            last_block: 7,
            epoch_blocks: 7,
            cheaters: vec![ValidatorId(3)],
            validators: vec![ValidatorBlockState::default(); 3],
            ..Default::default()
        };
        bs.validators[0].uptime = 100;
        let next = bs.on_new_epoch(4);
        assert_eq!(next.last_block, 7);
        assert_eq!(next.epoch_blocks, 0);
        assert!(next.cheaters.is_empty());
        assert_eq!(next.validators.len(), 4);
        assert_eq!(next.validators[0].uptime, 0);
    }

    #[test]
    fn test_epoch_state_hash_tracks_validators() {
        let mut es = EpochState::default();
        let h1 = es.hash();
        es.validators = ValidatorSet::build([Validator {
            id: ValidatorId(1),
            pubkey: [1u8; 32],
            weight: 10,
        }]);
        assert_ne!(h1, es.hash());
    }
}
