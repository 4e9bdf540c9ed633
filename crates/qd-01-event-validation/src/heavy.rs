//! Cryptographic validation: signatures and payload binding.
//!
//! Deferred to the tail of the chain because signature verification is the
//! CPU-costly step; [`HeavyChecker::validate_batch`] fans a batch out over
//! rayon so per-peer decode threads are not serialized behind it.

use crate::error::{ValidationError, ValidationResult};
use crate::ports::{DecidedReader, EpochReader};
use rayon::prelude::*;
use shared_types::{
    Epoch, Event, MisbehaviourProof, PublicKey, SignedBlockVotes, SignedEpochVote, ValidatorId,
};
use std::sync::Arc;

pub struct HeavyChecker<R: EpochReader, D: DecidedReader> {
    reader: Arc<R>,
    decided: Arc<D>,
}

impl<R: EpochReader, D: DecidedReader> HeavyChecker<R, D> {
    pub fn new(reader: Arc<R>, decided: Arc<D>) -> Self {
        Self { reader, decided }
    }

    fn pubkey(&self, epoch: Epoch, validator: ValidatorId) -> ValidationResult<PublicKey> {
        self.reader
            .pubkey(epoch, validator)
            .ok_or(ValidationError::UnknownPubkey {
                creator: validator,
                epoch,
            })
    }

    pub fn validate(&self, event: &Event) -> ValidationResult<()> {
        let pubkey = self.pubkey(event.epoch, event.creator)?;
        shared_crypto::verify(&pubkey, &event.signing_hash(), &event.signature).map_err(|_| {
            ValidationError::WrongSignature {
                creator: event.creator,
            }
        })?;
        if event.compute_payload_hash() != event.payload_hash {
            return Err(ValidationError::WrongPayloadHash);
        }

        if let Some(bvs) = &event.block_votes {
            self.verify_block_votes(bvs)?;
        }
        if let Some(ev) = &event.epoch_vote {
            self.verify_epoch_vote(ev)?;
        }
        for mp in &event.misbehaviour_proofs {
            self.validate_mp(mp)?;
        }
        Ok(())
    }

    /// Validate a batch of events in parallel. Fails with the error of the
    /// first invalid event encountered.
    pub fn validate_batch(&self, events: &[Arc<Event>]) -> ValidationResult<()>
    where
        R: Sync,
        D: Sync,
    {
        events
            .par_iter()
            .map(|event| self.validate(event))
            .collect::<ValidationResult<Vec<()>>>()?;
        Ok(())
    }

    fn verify_block_votes(&self, bvs: &SignedBlockVotes) -> ValidationResult<()> {
        let pubkey = self.pubkey(bvs.votes.epoch, bvs.creator)?;
        shared_crypto::verify(&pubkey, &bvs.signing_hash(), &bvs.signature)
            .map_err(|_| ValidationError::WrongVotesSignature)
    }

    fn verify_epoch_vote(&self, ev: &SignedEpochVote) -> ValidationResult<()> {
        // A record for epoch E is sealed (and voted on) by the validators
        // of epoch E-1.
        let pubkey = self.pubkey(ev.vote.epoch.saturating_sub(1), ev.creator)?;
        shared_crypto::verify(&pubkey, &ev.signing_hash(), &ev.signature)
            .map_err(|_| ValidationError::WrongVotesSignature)
    }

    /// Signature rules for both proof halves plus the decided-result
    /// semantics for wrong-vote variants. Structural rules (same slot,
    /// liability window) already ran in basiccheck.
    pub fn validate_mp(&self, mp: &MisbehaviourProof) -> ValidationResult<()> {
        match mp {
            MisbehaviourProof::EventsDoublesign { a, b } => {
                for half in [a, b] {
                    let pubkey = self.pubkey(half.locator.epoch, half.locator.creator)?;
                    shared_crypto::verify(&pubkey, &half.locator.hash(), &half.signature)
                        .map_err(|_| ValidationError::WrongMPSignature)?;
                }
                Ok(())
            }
            MisbehaviourProof::BlockVoteDoublesign { a, b } => {
                self.verify_block_votes(a)?;
                self.verify_block_votes(b)
            }
            MisbehaviourProof::WrongBlockVote { a, b } => {
                self.verify_block_votes(a)?;
                self.verify_block_votes(b)?;
                self.check_block_votes_wrong(a)
            }
            MisbehaviourProof::EpochVoteDoublesign { a, b } => {
                self.verify_epoch_vote(a)?;
                self.verify_epoch_vote(b)
            }
            MisbehaviourProof::WrongEpochVote { a, b } => {
                self.verify_epoch_vote(a)?;
                self.verify_epoch_vote(b)?;
                self.check_epoch_vote_wrong(a)
            }
        }
    }

    /// A block vote is wrong when it disagrees with a locally decided
    /// result. Undecided heights cannot convict anyone yet.
    fn check_block_votes_wrong(&self, bvs: &SignedBlockVotes) -> ValidationResult<()> {
        let mut any_decided = false;
        for height in bvs.votes.start..=bvs.votes.last() {
            if let Some(decided) = self.decided.decided_block_hash(height) {
                any_decided = true;
                if bvs.votes.vote_for(height) != Some(&decided) {
                    return Ok(());
                }
            }
        }
        if any_decided {
            Err(ValidationError::NoCrimeInMP)
        } else {
            Err(ValidationError::MPNotDecidedYet {
                index: bvs.votes.start,
            })
        }
    }

    fn check_epoch_vote_wrong(&self, ev: &SignedEpochVote) -> ValidationResult<()> {
        match self.decided.decided_epoch_hash(ev.vote.epoch) {
            Some(decided) if decided != ev.vote.vote => Ok(()),
            Some(_) => Err(ValidationError::NoCrimeInMP),
            None => Err(ValidationError::MPNotDecidedYet {
                index: ev.vote.epoch,
            }),
        }
    }
}
