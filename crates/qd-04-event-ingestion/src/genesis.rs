//! Genesis bootstrapping of the decided state.

use qd_03_chain_storage::Store;
use shared_types::{
    BlockState, EpochState, Hash, Timestamp, ValidatorBlockState, ValidatorSet,
};
use tracing::info;

/// First epoch of a fresh chain.
pub const GENESIS_EPOCH: u64 = 1;

/// Install the initial decided state: epoch 1 with the genesis validator
/// set, zero blocks, and the execution layer's genesis root.
pub fn bootstrap_genesis(
    store: &Store,
    validators: ValidatorSet,
    genesis_root: Hash,
    genesis_time: Timestamp,
) {
    let epoch_state = EpochState {
        epoch: GENESIS_EPOCH,
        epoch_start: genesis_time,
        prev_epoch_start: genesis_time,
        validators,
    };
    let block_state = BlockState {
        last_block: 0,
        last_block_time: genesis_time,
        epoch_blocks: 0,
        final_state_root: genesis_root,
        validators: vec![ValidatorBlockState::default(); epoch_state.validators.len()],
        cheaters: Vec::new(),
    };
    store.set_historical_epoch_state(&epoch_state);
    store.set_block_epoch_state(block_state, epoch_state);
    info!(epoch = GENESIS_EPOCH, "bootstrapped genesis state");
}
