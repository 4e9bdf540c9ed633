//! Per-block validator bookkeeping driven by confirmed events.

use shared_types::{BlockState, EpochState, Event, NANOS_PER_SEC};
use tracing::trace;

/// Gaps longer than this between a validator's consecutive confirmed
/// events do not accrue uptime; the validator was presumably offline.
pub const UPTIME_MAX_GAP: u64 = 60 * NANOS_PER_SEC;

/// Fold one confirmed event into the working block state: last-event
/// tracking, online-time accrual.
pub fn apply_event(block_state: &mut BlockState, epoch_state: &EpochState, event: &Event) {
    let Some(idx) = epoch_state.validators.index_of(event.creator) else {
        // Confirmed event from a validator no longer in the set (sealed
        // out mid-decision); nothing to account.
        trace!(creator = %event.creator, "confirmed event from non-member creator");
        return;
    };
    let vs = &mut block_state.validators[idx];
    if vs.last_online > 0 && event.creation_time > vs.last_online {
        let gap = event.creation_time - vs.last_online;
        if gap <= UPTIME_MAX_GAP {
            vs.uptime += gap;
        }
    }
    if event.creation_time > vs.last_online {
        vs.last_online = event.creation_time;
    }
    vs.last_event = Some(event.id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Validator, ValidatorBlockState, ValidatorId, ValidatorSet};

    fn setup() -> (BlockState, EpochState) {
        let validators = ValidatorSet::build([Validator {
            id: ValidatorId(1),
            pubkey: [1u8; 32],
            weight: 10,
        }]);
        let block_state = BlockState {
            validators: vec![ValidatorBlockState::default()],
            ..Default::default()
        };
        let epoch_state = EpochState {
            epoch: 1,
            validators,
            ..Default::default()
        };
        (block_state, epoch_state)
    }

    fn event_at(time: u64) -> Event {
        Event {
            epoch: 1,
            seq: 1,
            creator: ValidatorId(1),
            lamport: 1,
            creation_time: time,
            med_time: time,
            ..Default::default()
        }
    }

    #[test]
    fn test_uptime_accrues_across_small_gaps() {
        let (mut bs, es) = setup();
        apply_event(&mut bs, &es, &event_at(10 * NANOS_PER_SEC));
        apply_event(&mut bs, &es, &event_at(15 * NANOS_PER_SEC));
        assert_eq!(bs.validators[0].uptime, 5 * NANOS_PER_SEC);
        assert_eq!(bs.validators[0].last_online, 15 * NANOS_PER_SEC);
    }

    #[test]
    fn test_long_gap_accrues_nothing() {
        let (mut bs, es) = setup();
        apply_event(&mut bs, &es, &event_at(10 * NANOS_PER_SEC));
        apply_event(&mut bs, &es, &event_at(500 * NANOS_PER_SEC));
        assert_eq!(bs.validators[0].uptime, 0);
        assert_eq!(bs.validators[0].last_online, 500 * NANOS_PER_SEC);
    }

    #[test]
    fn test_out_of_order_confirmation_keeps_latest() {
        let (mut bs, es) = setup();
        apply_event(&mut bs, &es, &event_at(20 * NANOS_PER_SEC));
        apply_event(&mut bs, &es, &event_at(10 * NANOS_PER_SEC));
        assert_eq!(bs.validators[0].last_online, 20 * NANOS_PER_SEC);
        assert_eq!(bs.validators[0].uptime, 0);
    }

    #[test]
    fn test_non_member_is_ignored() {
        let (mut bs, es) = setup();
        let mut e = event_at(10);
        e.creator = ValidatorId(9);
        apply_event(&mut bs, &es, &e);
        assert_eq!(bs.validators[0].last_event, None);
    }
}
