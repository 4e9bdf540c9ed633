//! Structural sanity checks. Context-free: no store, no crypto.

use crate::error::{ValidationError, ValidationResult};
use shared_types::{
    Epoch, Event, MisbehaviourProof, Rules, SignedBlockVotes, SignedEpochVote, SignedTransaction,
};
use std::collections::HashSet;

/// Upper bound on seq/frame style counters; anything near the type maximum
/// is a malformed or hostile encoding.
const MAX_COUNTER: u32 = u32::MAX / 2;
/// Upper bound on epoch/lamport/gas style counters.
const MAX_SCALAR: u64 = u64::MAX / 2;

/// Supported event format version.
const EVENT_VERSION: u8 = 1;

/// Stateless structural validation of events and their payloads.
pub struct BasicChecker {
    rules: Rules,
}

impl BasicChecker {
    pub fn new(rules: Rules) -> Self {
        Self { rules }
    }

    pub fn validate(&self, event: &Event) -> ValidationResult<()> {
        if event.version != EVENT_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                version: event.version,
            });
        }
        if event.seq == 0 || event.seq > MAX_COUNTER {
            return Err(ValidationError::HugeValue { field: "seq" });
        }
        if event.frame > MAX_COUNTER {
            return Err(ValidationError::HugeValue { field: "frame" });
        }
        if event.epoch == 0 || event.epoch > MAX_SCALAR {
            return Err(ValidationError::HugeValue { field: "epoch" });
        }
        if event.lamport == 0 || event.lamport > MAX_SCALAR {
            return Err(ValidationError::HugeValue { field: "lamport" });
        }
        if event.gas_power_used > MAX_SCALAR {
            return Err(ValidationError::HugeValue {
                field: "gas_power_used",
            });
        }
        if event.creation_time == 0 || event.med_time == 0 {
            return Err(ValidationError::ZeroTime);
        }
        if (event.seq == 1) != event.self_parent.is_none() {
            return Err(ValidationError::MalformedSelfParent { seq: event.seq });
        }
        let count = event.parent_count();
        if count > self.rules.dag.max_parents {
            return Err(ValidationError::TooManyParents {
                count,
                limit: self.rules.dag.max_parents,
            });
        }
        let unique: HashSet<_> = event.parents().collect();
        if unique.len() != count {
            return Err(ValidationError::DuplicateParents);
        }
        if event.extra.len() > self.rules.dag.max_extra_bytes {
            return Err(ValidationError::ExtraTooLarge {
                size: event.extra.len(),
                limit: self.rules.dag.max_extra_bytes,
            });
        }

        for tx in &event.transactions {
            self.validate_tx(tx)?;
        }
        for mp in &event.misbehaviour_proofs {
            self.validate_mp(mp, event.epoch)?;
        }
        if let Some(bvs) = &event.block_votes {
            self.validate_block_votes(bvs, event)?;
        }
        if let Some(ev) = &event.epoch_vote {
            self.validate_epoch_vote(ev, event)?;
        }
        Ok(())
    }

    fn validate_tx(&self, tx: &SignedTransaction) -> ValidationResult<()> {
        let intrinsic = tx.intrinsic_gas();
        if intrinsic > tx.gas_limit {
            return Err(ValidationError::IntrinsicGas {
                required: intrinsic,
                limit: tx.gas_limit,
            });
        }
        if tx.max_priority_fee_per_gas > tx.max_fee_per_gas {
            return Err(ValidationError::TipAboveFeeCap);
        }
        if tx.gas_limit > self.rules.blocks.block_gas_hard_limit {
            return Err(ValidationError::TxGasAboveHardLimit {
                limit: tx.gas_limit,
                hard_limit: self.rules.blocks.block_gas_hard_limit,
            });
        }
        Ok(())
    }

    /// Structural misbehaviour-proof rules: the halves must describe a
    /// crime shape, and the proof must fall inside the liability window.
    /// Signatures and decided-result semantics are heavycheck's job.
    pub fn validate_mp(&self, mp: &MisbehaviourProof, epoch: Epoch) -> ValidationResult<()> {
        if mp.epoch() < epoch.saturating_sub(self.rules.max_liable_epochs) {
            return Err(ValidationError::MPTooLate {
                proof_epoch: mp.epoch(),
                epoch,
            });
        }
        let is_crime_shape = match mp {
            MisbehaviourProof::EventsDoublesign { a, b } => {
                a.locator.same_slot(&b.locator) && a.locator.hash() != b.locator.hash()
            }
            MisbehaviourProof::BlockVoteDoublesign { a, b } => {
                a.creator == b.creator && a.conflicts_with(b)
            }
            // Wrong-vote proofs need two independent voters making the same
            // (allegedly wrong) claim.
            MisbehaviourProof::WrongBlockVote { a, b } => {
                a.creator != b.creator && a.votes == b.votes && !a.votes.votes.is_empty()
            }
            MisbehaviourProof::EpochVoteDoublesign { a, b } => {
                a.creator == b.creator
                    && a.vote.epoch == b.vote.epoch
                    && a.vote.vote != b.vote.vote
            }
            MisbehaviourProof::WrongEpochVote { a, b } => {
                a.creator != b.creator && a.vote == b.vote
            }
        };
        if !is_crime_shape {
            return Err(ValidationError::NoCrimeInMP);
        }
        Ok(())
    }

    fn validate_block_votes(&self, bvs: &SignedBlockVotes, event: &Event) -> ValidationResult<()> {
        if bvs.creator != event.creator {
            return Err(ValidationError::WrongVotesCreator {
                votes_creator: bvs.creator,
                creator: event.creator,
            });
        }
        if bvs.votes.votes.is_empty() || bvs.votes.start == 0 || bvs.votes.epoch == 0 {
            return Err(ValidationError::MalformedVotes);
        }
        if bvs.votes.epoch > event.epoch {
            return Err(ValidationError::VotesFromFuture {
                vote_epoch: bvs.votes.epoch,
                epoch: event.epoch,
            });
        }
        Ok(())
    }

    fn validate_epoch_vote(&self, ev: &SignedEpochVote, event: &Event) -> ValidationResult<()> {
        if ev.creator != event.creator {
            return Err(ValidationError::WrongVotesCreator {
                votes_creator: ev.creator,
                creator: event.creator,
            });
        }
        if ev.vote.epoch == 0 {
            return Err(ValidationError::MalformedVotes);
        }
        if ev.vote.epoch > event.epoch {
            return Err(ValidationError::VotesFromFuture {
                vote_epoch: ev.vote.epoch,
                epoch: event.epoch,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        BlockVotes, EventId, EventLocator, SignedEventLocator, ValidatorId, U256,
    };

    fn checker() -> BasicChecker {
        BasicChecker::new(Rules::default())
    }

    fn valid_event() -> Event {
        Event {
            epoch: 5,
            seq: 1,
            lamport: 1,
            creation_time: 100,
            med_time: 100,
            ..Default::default()
        }
    }

    fn locator(creator: u32, epoch: Epoch, seq: u32, base: u8) -> SignedEventLocator {
        SignedEventLocator {
            locator: EventLocator {
                base_hash: [base; 32],
                creator: ValidatorId(creator),
                epoch,
                seq,
                lamport: 1,
                payload_hash: [0u8; 32],
            },
            signature: [0u8; 64],
        }
    }

    #[test]
    fn test_valid_event_passes() {
        assert_eq!(checker().validate(&valid_event()), Ok(()));
    }

    #[test]
    fn test_zero_times_rejected() {
        let mut e = valid_event();
        e.med_time = 0;
        assert_eq!(checker().validate(&e), Err(ValidationError::ZeroTime));
    }

    #[test]
    fn test_seq_one_with_self_parent_rejected() {
        let mut e = valid_event();
        e.self_parent = Some(EventId([1u8; 32]));
        assert_eq!(
            checker().validate(&e),
            Err(ValidationError::MalformedSelfParent { seq: 1 })
        );
    }

    #[test]
    fn test_seq_two_without_self_parent_rejected() {
        let mut e = valid_event();
        e.seq = 2;
        assert_eq!(
            checker().validate(&e),
            Err(ValidationError::MalformedSelfParent { seq: 2 })
        );
    }

    #[test]
    fn test_duplicate_parents_rejected() {
        let mut e = valid_event();
        e.other_parents = vec![EventId([1u8; 32]), EventId([1u8; 32])];
        assert_eq!(
            checker().validate(&e),
            Err(ValidationError::DuplicateParents)
        );
    }

    #[test]
    fn test_tx_below_intrinsic_gas_rejected() {
        let mut e = valid_event();
        e.transactions.push(SignedTransaction {
            from: [0u8; 20],
            to: Some([1u8; 20]),
            nonce: 0,
            value: U256::zero(),
            gas_limit: 20_000,
            max_fee_per_gas: U256::one(),
            max_priority_fee_per_gas: U256::zero(),
            data: Vec::new(),
            signature: [0u8; 64],
        });
        assert_eq!(
            checker().validate(&e),
            Err(ValidationError::IntrinsicGas {
                required: 21_000,
                limit: 20_000
            })
        );
    }

    #[test]
    fn test_identical_locators_are_no_crime() {
        let mp = MisbehaviourProof::EventsDoublesign {
            a: locator(1, 5, 3, 7),
            b: locator(1, 5, 3, 7),
        };
        assert_eq!(
            checker().validate_mp(&mp, 5),
            Err(ValidationError::NoCrimeInMP)
        );
    }

    #[test]
    fn test_conflicting_locators_are_a_crime() {
        let mp = MisbehaviourProof::EventsDoublesign {
            a: locator(1, 5, 3, 7),
            b: locator(1, 5, 3, 8),
        };
        assert_eq!(checker().validate_mp(&mp, 5), Ok(()));
    }

    #[test]
    fn test_mp_outside_liability_window_rejected() {
        // Default window is 2 epochs; a proof about epoch 1 accused at
        // epoch 10 is long stale.
        let mp = MisbehaviourProof::EventsDoublesign {
            a: locator(1, 1, 3, 7),
            b: locator(1, 1, 3, 8),
        };
        assert_eq!(
            checker().validate_mp(&mp, 10),
            Err(ValidationError::MPTooLate {
                proof_epoch: 1,
                epoch: 10
            })
        );
    }

    #[test]
    fn test_future_votes_rejected() {
        let mut e = valid_event();
        e.block_votes = Some(SignedBlockVotes {
            creator: e.creator,
            votes: BlockVotes {
                epoch: 9,
                start: 1,
                votes: vec![[1u8; 32]],
            },
            signature: [0u8; 64],
        });
        assert_eq!(
            checker().validate(&e),
            Err(ValidationError::VotesFromFuture {
                vote_epoch: 9,
                epoch: 5
            })
        );
    }
}
