//! Deterministic event and transaction ordering.
//!
//! Execution order within a block is a pure function of the confirmed
//! events' Lamport times (ties broken by event id), never of network
//! arrival order.

use shared_types::{Event, EventId, Hash, SignedTransaction};
use std::collections::HashSet;
use std::sync::Arc;

/// Sort confirmed events by (Lamport, id).
pub fn sort_events(mut events: Vec<Arc<Event>>) -> Vec<Arc<Event>> {
    events.sort_by_cached_key(|e| (e.lamport, e.id()));
    events
}

/// Trim a Lamport-sorted event sequence to the block gas hard limit.
///
/// Walks from the end accumulating gas power; the first index (from the
/// end) whose addition exceeds the limit becomes the cut, and the block
/// keeps only the suffix after it. The result is the maximal sorted suffix
/// whose cumulative gas power fits: the most recent events always make it
/// in, earlier confirmed events spill into later blocks.
pub fn spill(events: Vec<Arc<Event>>, gas_limit: u64) -> (Vec<Arc<Event>>, usize) {
    let mut cumulative: u64 = 0;
    let mut cut = 0;
    for i in (0..events.len()).rev() {
        cumulative = cumulative.saturating_add(events[i].gas_power_used);
        if cumulative > gas_limit {
            cut = i + 1;
            break;
        }
    }
    let kept = events[cut..].to_vec();
    (kept, cut)
}

/// Transactions concatenated in event order, each attributed to the first
/// event carrying it. Duplicates across events keep the first owner.
#[derive(Clone, Debug, Default)]
pub struct TxAttribution {
    pub txs: Vec<SignedTransaction>,
    /// Parallel to `txs`: the owning event.
    pub owners: Vec<EventId>,
}

pub fn collect_txs(events: &[Arc<Event>]) -> TxAttribution {
    let mut out = TxAttribution::default();
    let mut seen: HashSet<Hash> = HashSet::new();
    for event in events {
        let id = event.id();
        for tx in &event.transactions {
            if seen.insert(tx.hash()) {
                out.txs.push(tx.clone());
                out.owners.push(id);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ValidatorId, U256};

    fn event(creator: u32, lamport: u64, gas_power_used: u64) -> Arc<Event> {
        Arc::new(Event {
            epoch: 1,
            seq: 1,
            creator: ValidatorId(creator),
            lamport,
            creation_time: 1,
            med_time: 1,
            gas_power_used,
            ..Default::default()
        })
    }

    fn lamports(events: &[Arc<Event>]) -> Vec<u64> {
        events.iter().map(|e| e.lamport).collect()
    }

    #[test]
    fn test_sort_is_by_lamport_then_id() {
        let a = event(1, 3, 0);
        let b = event(2, 1, 0);
        let c = event(3, 2, 0);
        let sorted = sort_events(vec![a, b, c]);
        assert_eq!(lamports(&sorted), vec![1, 2, 3]);

        // Equal Lamports: id decides, deterministically.
        let d = event(4, 5, 0);
        let e = event(5, 5, 0);
        let expected = if d.id() < e.id() {
            vec![d.id(), e.id()]
        } else {
            vec![e.id(), d.id()]
        };
        let sorted = sort_events(vec![Arc::clone(&e), Arc::clone(&d)]);
        let ids: Vec<_> = sorted.iter().map(|x| x.id()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_spill_keeps_everything_under_limit() {
        let events = vec![event(1, 1, 10), event(2, 2, 10), event(3, 3, 10)];
        let (kept, spilled) = spill(events, 30);
        assert_eq!(spilled, 0);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_spill_trims_from_the_front() {
        // Cumulative from the end: 10, 20, 30, 40 > 35 at index 0.
        let events = vec![
            event(1, 1, 10),
            event(2, 2, 10),
            event(3, 3, 10),
            event(4, 4, 10),
        ];
        let (kept, spilled) = spill(events, 35);
        assert_eq!(spilled, 1);
        assert_eq!(lamports(&kept), vec![2, 3, 4]);
    }

    #[test]
    fn test_spill_boundary_exact_fit() {
        // Cumulative equal to the limit is not an overflow.
        let events = vec![event(1, 1, 10), event(2, 2, 10)];
        let (kept, spilled) = spill(events, 20);
        assert_eq!(spilled, 0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_spill_boundary_one_over() {
        let events = vec![event(1, 1, 10), event(2, 2, 11)];
        let (kept, spilled) = spill(events, 20);
        assert_eq!(spilled, 1);
        assert_eq!(lamports(&kept), vec![2]);
    }

    #[test]
    fn test_spill_single_oversized_event_cuts_everything_before_it() {
        // The last event alone exceeds the limit: nothing survives but it
        // still defines the cut, so earlier events spill.
        let events = vec![event(1, 1, 5), event(2, 2, 100)];
        let (kept, spilled) = spill(events, 50);
        assert_eq!(spilled, 2);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_spill_empty_input() {
        let (kept, spilled) = spill(Vec::new(), 100);
        assert!(kept.is_empty());
        assert_eq!(spilled, 0);
    }

    #[test]
    fn test_kept_suffix_is_maximal() {
        // Exhaustive check over a range of limits: the kept suffix must be
        // the longest suffix fitting the limit.
        let gas: Vec<u64> = vec![7, 3, 9, 4, 6];
        let events: Vec<Arc<Event>> = gas
            .iter()
            .enumerate()
            .map(|(i, g)| event(i as u32 + 1, i as u64 + 1, *g))
            .collect();
        for limit in 0..40u64 {
            let (kept, spilled) = spill(events.clone(), limit);
            let kept_sum: u64 = kept.iter().map(|e| e.gas_power_used).sum();
            assert!(kept_sum <= limit, "limit {limit}");
            if spilled > 0 {
                // Including one more event from below the cut must overflow.
                let wider: u64 = kept_sum + events[spilled - 1].gas_power_used;
                assert!(wider > limit, "limit {limit}: suffix not maximal");
            }
        }
    }

    #[test]
    fn test_collect_txs_first_occurrence_wins() {
        let tx = SignedTransaction {
            from: [1u8; 20],
            to: Some([2u8; 20]),
            nonce: 0,
            value: U256::from(5),
            gas_limit: 21_000,
            max_fee_per_gas: U256::one(),
            max_priority_fee_per_gas: U256::zero(),
            data: Vec::new(),
            signature: [0u8; 64],
        };
        let mut e1 = Event {
            epoch: 1,
            seq: 1,
            creator: ValidatorId(1),
            lamport: 1,
            creation_time: 1,
            med_time: 1,
            ..Default::default()
        };
        e1.transactions.push(tx.clone());
        let mut e2 = e1.clone();
        e2.creator = ValidatorId(2);
        // Same tx duplicated across both events.
        let e1 = Arc::new(e1);
        let e2 = Arc::new(e2);

        let attribution = collect_txs(&[Arc::clone(&e1), e2]);
        assert_eq!(attribution.txs.len(), 1);
        assert_eq!(attribution.owners, vec![e1.id()]);
    }
}
