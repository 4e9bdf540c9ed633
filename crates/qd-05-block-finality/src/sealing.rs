//! Epoch sealing: the only operation that may swap the validator set.

use shared_types::{BlockState, EpochState, Rules, Timestamp};
use tracing::info;

/// Epoch-length policy: seal once the epoch has enough blocks or has
/// lasted long enough. `block_state` already counts the block being
/// finalized.
pub fn should_seal(
    block_state: &BlockState,
    epoch_state: &EpochState,
    seal_time: Timestamp,
    rules: &Rules,
) -> bool {
    if block_state.epoch_blocks >= rules.blocks.max_epoch_blocks {
        return true;
    }
    seal_time.saturating_sub(epoch_state.epoch_start) >= rules.blocks.max_epoch_duration
}

/// Seal the epoch: swap in the next validator set (cheaters pruned), reset
/// per-epoch counters, and anchor the new epoch at `seal_time`.
pub fn seal_epoch(
    block_state: &BlockState,
    epoch_state: &EpochState,
    seal_time: Timestamp,
) -> (BlockState, EpochState) {
    let next_validators = epoch_state.validators.without(&block_state.cheaters);
    if !block_state.cheaters.is_empty() {
        info!(
            epoch = epoch_state.epoch,
            cheaters = block_state.cheaters.len(),
            "pruning convicted validators at epoch seal"
        );
    }
    let next_epoch = EpochState {
        epoch: epoch_state.epoch + 1,
        epoch_start: seal_time,
        prev_epoch_start: epoch_state.epoch_start,
        validators: next_validators,
    };
    let next_block_state = block_state.on_new_epoch(next_epoch.validators.len());
    (next_block_state, next_epoch)
}
