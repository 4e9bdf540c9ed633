//! Observation vectors and median time.

use crate::error::{IndexerError, IndexerResult};
use shared_types::{Epoch, Event, EventId, EventSeq, Timestamp, ValidatorSet};
use std::collections::HashMap;
use tracing::debug;

/// The highest event observed from one validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObservedEvent {
    pub seq: EventSeq,
    pub id: EventId,
    /// The observed event's claimed creation time.
    pub claimed_time: Timestamp,
}

/// Per-event observation vector, indexed by the validator's dense index
/// within the epoch's set.
type Vector = Vec<Option<ObservedEvent>>;

/// The DAG index for one epoch.
///
/// Holds a vector per indexed event. Events are staged by `add` and become
/// permanent only on `flush`; `drop_not_flushed` discards the stage.
pub struct DagIndexer {
    epoch: Epoch,
    epoch_start: Timestamp,
    validators: ValidatorSet,
    vectors: HashMap<EventId, Vector>,
    staged: Vec<EventId>,
}

impl DagIndexer {
    pub fn new(epoch: Epoch, epoch_start: Timestamp, validators: ValidatorSet) -> Self {
        Self {
            epoch,
            epoch_start,
            validators,
            vectors: HashMap::new(),
            staged: Vec::new(),
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Discard all per-epoch state and re-key for a new epoch.
    pub fn reset(&mut self, epoch: Epoch, epoch_start: Timestamp, validators: ValidatorSet) {
        debug!(epoch, "resetting DAG index");
        self.epoch = epoch;
        self.epoch_start = epoch_start;
        self.validators = validators;
        self.vectors.clear();
        self.staged.clear();
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.vectors.contains_key(id)
    }

    /// Stage an event into the index.
    ///
    /// Parents must already be indexed. The stage is committed by `flush` or
    /// discarded by `drop_not_flushed`.
    pub fn add(&mut self, event: &Event) -> IndexerResult<()> {
        let id = event.id();
        if self.vectors.contains_key(&id) {
            return Err(IndexerError::AlreadyIndexed { id });
        }
        let creator_idx = self.validators.index_of(event.creator).ok_or(
            IndexerError::UnknownCreator {
                creator: event.creator,
                epoch: self.epoch,
            },
        )?;

        let mut vector: Vector = vec![None; self.validators.len()];
        for parent in event.parents() {
            let parent_vec = self
                .vectors
                .get(parent)
                .ok_or(IndexerError::ParentNotIndexed { parent: *parent })?;
            for (slot, observed) in vector.iter_mut().zip(parent_vec.iter()) {
                if let Some(obs) = observed {
                    if slot.map_or(true, |cur| cur.seq < obs.seq) {
                        *slot = Some(*obs);
                    }
                }
            }
        }
        // The event observes itself.
        let own = ObservedEvent {
            seq: event.seq,
            id,
            claimed_time: event.creation_time,
        };
        if vector[creator_idx].map_or(true, |cur| cur.seq < own.seq) {
            vector[creator_idx] = Some(own);
        }

        self.vectors.insert(id, vector);
        self.staged.push(id);
        Ok(())
    }

    /// Commit everything staged since the last flush.
    pub fn flush(&mut self) {
        self.staged.clear();
    }

    /// Roll back everything staged since the last flush.
    pub fn drop_not_flushed(&mut self) {
        for id in self.staged.drain(..) {
            self.vectors.remove(&id);
        }
    }

    /// Stake-weighted median of the creation times observed by `id`.
    ///
    /// Validators the event does not observe contribute the epoch start
    /// time, so early-epoch medians are anchored rather than skewed by a
    /// partial view.
    pub fn median_time(&self, id: &EventId) -> IndexerResult<Timestamp> {
        let vector = self
            .vectors
            .get(id)
            .ok_or(IndexerError::NotIndexed { id: *id })?;

        let mut samples: Vec<(Timestamp, u64)> = Vec::with_capacity(self.validators.len());
        for (idx, observed) in vector.iter().enumerate() {
            let weight = self
                .validators
                .by_index(idx)
                .map(|v| v.weight)
                .unwrap_or(0);
            let time = observed.map_or(self.epoch_start, |obs| obs.claimed_time);
            samples.push((time, weight));
        }
        samples.sort_by_key(|(time, _)| *time);

        let total: u64 = samples.iter().map(|(_, w)| w).sum();
        let mut accumulated = 0u64;
        for (time, weight) in &samples {
            accumulated += weight;
            if accumulated * 2 > total {
                return Ok(*time);
            }
        }
        // Empty validator set only; callers never build one.
        Ok(self.epoch_start)
    }

    /// The highest observed event per validator, as seen by `id`.
    pub fn observations(&self, id: &EventId) -> IndexerResult<&[Option<ObservedEvent>]> {
        self.vectors
            .get(id)
            .map(|v| v.as_slice())
            .ok_or(IndexerError::NotIndexed { id: *id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Validator, ValidatorId, NANOS_PER_SEC};

    fn validators(n: u32) -> ValidatorSet {
        ValidatorSet::build((1..=n).map(|i| Validator {
            id: ValidatorId(i),
            pubkey: [i as u8; 32],
            weight: 10,
        }))
    }

    fn event(
        creator: u32,
        seq: EventSeq,
        time_secs: u64,
        self_parent: Option<EventId>,
        other_parents: Vec<EventId>,
    ) -> Event {
        Event {
            epoch: 1,
            seq,
            creator: ValidatorId(creator),
            lamport: seq as u64,
            creation_time: time_secs * NANOS_PER_SEC,
            self_parent,
            other_parents,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_rejects_unknown_parent() {
        let mut idx = DagIndexer::new(1, 0, validators(3));
        let e = event(1, 2, 5, Some(EventId([9u8; 32])), vec![]);
        assert_eq!(
            idx.add(&e),
            Err(IndexerError::ParentNotIndexed {
                parent: EventId([9u8; 32])
            })
        );
    }

    #[test]
    fn test_add_rejects_unknown_creator() {
        let mut idx = DagIndexer::new(1, 0, validators(3));
        let e = event(9, 1, 5, None, vec![]);
        assert!(matches!(
            idx.add(&e),
            Err(IndexerError::UnknownCreator { .. })
        ));
    }

    #[test]
    fn test_median_time_unobserved_validators_anchor_to_epoch_start() {
        // 3 validators, only one event: the other two contribute epoch_start.
        let epoch_start = 100 * NANOS_PER_SEC;
        let mut idx = DagIndexer::new(1, epoch_start, validators(3));
        let e = event(1, 1, 500, None, vec![]);
        idx.add(&e).unwrap();
        // Samples: [epoch_start, epoch_start, 500s]; median is epoch_start.
        assert_eq!(idx.median_time(&e.id()).unwrap(), epoch_start);
    }

    #[test]
    fn test_median_time_over_majority() {
        let mut idx = DagIndexer::new(1, 0, validators(3));
        let e1 = event(1, 1, 10, None, vec![]);
        let e2 = event(2, 1, 20, None, vec![e1.id()]);
        let e3 = event(3, 1, 30, None, vec![e2.id()]);
        idx.add(&e1).unwrap();
        idx.add(&e2).unwrap();
        idx.add(&e3).unwrap();
        // e3 observes all three: times 10, 20, 30 with equal weight.
        assert_eq!(idx.median_time(&e3.id()).unwrap(), 20 * NANOS_PER_SEC);
    }

    #[test]
    fn test_merge_keeps_highest_seq_per_validator() {
        let mut idx = DagIndexer::new(1, 0, validators(2));
        let a1 = event(1, 1, 10, None, vec![]);
        let a2 = event(1, 2, 40, Some(a1.id()), vec![]);
        let b1 = event(2, 1, 20, None, vec![a1.id()]);
        idx.add(&a1).unwrap();
        idx.add(&a2).unwrap();
        idx.add(&b1).unwrap();
        // b2 references both a2 (seq 2) and, transitively via b1, a1 (seq 1).
        let b2 = event(2, 2, 50, Some(b1.id()), vec![a2.id()]);
        idx.add(&b2).unwrap();
        let obs = idx.observations(&b2.id()).unwrap();
        assert_eq!(obs[0].unwrap().seq, 2);
        assert_eq!(obs[0].unwrap().id, a2.id());
        assert_eq!(obs[1].unwrap().seq, 2);
    }

    #[test]
    fn test_drop_not_flushed_rolls_back_stage() {
        let mut idx = DagIndexer::new(1, 0, validators(2));
        let e1 = event(1, 1, 10, None, vec![]);
        idx.add(&e1).unwrap();
        idx.flush();

        let e2 = event(2, 1, 20, None, vec![e1.id()]);
        idx.add(&e2).unwrap();
        assert!(idx.contains(&e2.id()));
        idx.drop_not_flushed();
        assert!(!idx.contains(&e2.id()));
        // Flushed events survive the rollback.
        assert!(idx.contains(&e1.id()));
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut idx = DagIndexer::new(1, 0, validators(2));
        let e1 = event(1, 1, 10, None, vec![]);
        idx.add(&e1).unwrap();
        assert!(matches!(
            idx.add(&e1),
            Err(IndexerError::AlreadyIndexed { .. })
        ));
    }
}
