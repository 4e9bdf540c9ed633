//! Vote tallying and full record import.

use crate::error::{LlrError, LlrResult};
use crate::watermark::actualize_lowest_index;
use qd_03_chain_storage::{Store, TxPosition};
use shared_types::{
    Block, BlockHeight, Epoch, FullBlockRecord, FullEpochRecord, Hash, SignedBlockVotes,
    SignedEpochVote,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Processes LLR votes and records against the store.
///
/// Signatures are assumed already verified (heavycheck validates votes both
/// inside events and standalone). Locking is the caller's contract: vote
/// processing and `apply_*` run under the engine lock, `check_*` does not
/// need it.
pub struct LlrProcessor {
    store: Arc<Store>,
}

impl LlrProcessor {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    // --- votes ---

    /// Tally a signed bundle of block votes.
    pub fn process_block_votes(&self, bvs: &SignedBlockVotes) -> LlrResult<()> {
        let epoch = bvs.votes.epoch;
        if self
            .store
            .has_processed_block_votes(bvs.creator, epoch, bvs.votes.start)
        {
            return Err(LlrError::AlreadyProcessedBVs {
                creator: bvs.creator,
                start: bvs.votes.start,
            });
        }
        let epoch_state = self
            .store
            .historical_epoch_state(epoch)
            .ok_or(LlrError::UnknownEpochBVs { epoch })?;
        let voter = epoch_state
            .validators
            .get(bvs.creator)
            .ok_or(LlrError::UnknownVoter {
                creator: bvs.creator,
                epoch,
            })?;
        let weight = voter.weight;
        let threshold = epoch_state.validators.llr_threshold();

        for (i, candidate) in bvs.votes.votes.iter().enumerate() {
            let height = bvs.votes.start + i as BlockHeight;
            self.tally_block_vote(height, candidate, weight, threshold);
        }
        self.store
            .mark_processed_block_votes(bvs.creator, epoch, bvs.votes.start);
        Ok(())
    }

    fn tally_block_vote(&self, height: BlockHeight, candidate: &Hash, weight: u64, threshold: u64) {
        let accumulated = self.store.block_vote_weight(height, candidate) + weight;
        self.store
            .set_block_vote_weight(height, candidate, accumulated);
        if accumulated < threshold {
            return;
        }
        match self.store.block_result(height) {
            None => {
                debug!(height, weight = accumulated, "LLR block result decided");
                self.store.set_block_result(height, candidate);
                let store = Arc::clone(&self.store);
                self.store.modify_llr_state(|llr| {
                    llr.lowest_block_to_decide = actualize_lowest_index(
                        llr.lowest_block_to_decide,
                        height,
                        |i| store.block_result(i).is_some(),
                    );
                });
            }
            Some(existing) if existing != *candidate => {
                // Two values above threshold means more than a third of the
                // stake double-signed. Misbehaviour proofs are the
                // accountability path; here it is an observability event.
                error!(height, "double-sign detected: second LLR block result reached quorum");
            }
            Some(_) => {}
        }
    }

    /// Tally a signed epoch vote.
    pub fn process_epoch_vote(&self, ev: &SignedEpochVote) -> LlrResult<()> {
        let epoch = ev.vote.epoch;
        if self.store.has_processed_epoch_vote(ev.creator, epoch) {
            return Err(LlrError::AlreadyProcessedEV {
                creator: ev.creator,
                epoch,
            });
        }
        // A record for epoch E was sealed by the validators of E-1.
        let sealer_epoch = epoch.saturating_sub(1);
        let epoch_state = self
            .store
            .historical_epoch_state(sealer_epoch)
            .ok_or(LlrError::UnknownEpochEV { epoch })?;
        let voter = epoch_state
            .validators
            .get(ev.creator)
            .ok_or(LlrError::UnknownVoter {
                creator: ev.creator,
                epoch: sealer_epoch,
            })?;
        let threshold = epoch_state.validators.llr_threshold();

        let accumulated = self.store.epoch_vote_weight(epoch, &ev.vote.vote) + voter.weight;
        self.store
            .set_epoch_vote_weight(epoch, &ev.vote.vote, accumulated);
        if accumulated >= threshold {
            match self.store.epoch_result(epoch) {
                None => {
                    debug!(epoch, weight = accumulated, "LLR epoch result decided");
                    self.store.set_epoch_result(epoch, &ev.vote.vote);
                    let store = Arc::clone(&self.store);
                    self.store.modify_llr_state(|llr| {
                        llr.lowest_epoch_to_decide = actualize_lowest_index(
                            llr.lowest_epoch_to_decide,
                            epoch,
                            |i| store.epoch_result(i).is_some(),
                        );
                    });
                }
                Some(existing) if existing != ev.vote.vote => {
                    error!(epoch, "double-sign detected: second LLR epoch result reached quorum");
                }
                Some(_) => {}
            }
        }
        self.store.mark_processed_epoch_vote(ev.creator, epoch);
        Ok(())
    }

    // --- records ---

    /// Validate a full block record against the decided vote. Lock-free.
    pub fn check_block_record(&self, record: &FullBlockRecord) -> LlrResult<()> {
        let height = record.height();
        let decided = self
            .store
            .block_result(height)
            .ok_or(LlrError::UndecidedBR { height })?;
        if self.store.has_block(height) {
            return Err(LlrError::AlreadyProcessedBR { height });
        }
        if record.hash() != decided {
            return Err(LlrError::MismatchedBR { height });
        }
        Ok(())
    }

    /// Import a checked block record. Caller holds the engine lock; the
    /// checks are repeated since the store may have advanced since
    /// `check_block_record`.
    pub fn apply_block_record(&self, record: &FullBlockRecord) -> LlrResult<()> {
        self.check_block_record(record)?;
        let height = record.height();

        self.store.set_block(Arc::new(record.block.clone()));
        for (offset, tx) in record.txs.iter().enumerate() {
            self.store.set_tx_position(
                &tx.hash(),
                &TxPosition {
                    block: height,
                    event: None,
                    offset: offset as u32,
                },
            );
        }
        let store = Arc::clone(&self.store);
        self.store.modify_llr_state(|llr| {
            llr.lowest_block_to_fill =
                actualize_lowest_index(llr.lowest_block_to_fill, height, |i| store.has_block(i));
        });
        info!(height, txs = record.txs.len(), "imported full block record");
        Ok(())
    }

    /// Validate a full epoch record against the decided vote. Lock-free.
    pub fn check_epoch_record(&self, record: &FullEpochRecord) -> LlrResult<()> {
        let epoch = record.epoch();
        let decided = self
            .store
            .epoch_result(epoch)
            .ok_or(LlrError::UndecidedER { epoch })?;
        if self.store.historical_epoch_state(epoch).is_some() {
            return Err(LlrError::AlreadyProcessedER { epoch });
        }
        if record.hash() != decided {
            return Err(LlrError::MismatchedER { epoch });
        }
        Ok(())
    }

    /// Import a checked epoch record. Caller holds the engine lock.
    pub fn apply_epoch_record(&self, record: &FullEpochRecord) -> LlrResult<()> {
        self.check_epoch_record(record)?;
        let epoch = record.epoch();

        self.store.set_historical_epoch_state(&record.epoch_state);
        // A record ahead of local state fast-forwards the node.
        let behind = !self.store.has_block_epoch_state()
            || self.store.block_epoch_state().1.epoch < epoch;
        if behind {
            self.store
                .set_block_epoch_state(record.block_state.clone(), record.epoch_state.clone());
        }
        let store = Arc::clone(&self.store);
        self.store.modify_llr_state(|llr| {
            llr.lowest_epoch_to_fill = actualize_lowest_index(llr.lowest_epoch_to_fill, epoch, |i| {
                store.historical_epoch_state(i).is_some()
            });
        });
        info!(epoch, "imported full epoch record");
        Ok(())
    }

    /// Record the sealed epoch this node just produced, so the epoch
    /// counts as decided and filled without waiting for remote votes.
    pub fn on_own_epoch(&self, record_hash: Hash, epoch: Epoch) {
        if self.store.epoch_result(epoch).is_none() {
            self.store.set_epoch_result(epoch, &record_hash);
        }
        let store = Arc::clone(&self.store);
        self.store.modify_llr_state(|llr| {
            llr.lowest_epoch_to_decide = actualize_lowest_index(
                llr.lowest_epoch_to_decide,
                epoch,
                |i| store.epoch_result(i).is_some(),
            );
            llr.lowest_epoch_to_fill = actualize_lowest_index(llr.lowest_epoch_to_fill, epoch, |i| {
                store.historical_epoch_state(i).is_some()
            });
        });
    }

    /// Convenience for finalization: record our own vote-equivalent results
    /// so freshly produced blocks count as decided and filled.
    pub fn on_own_block(&self, block: &Block, record_hash: Hash) {
        let height = block.height;
        if self.store.block_result(height).is_none() {
            self.store.set_block_result(height, &record_hash);
        }
        let store = Arc::clone(&self.store);
        self.store.modify_llr_state(|llr| {
            llr.lowest_block_to_decide = actualize_lowest_index(
                llr.lowest_block_to_decide,
                height,
                |i| store.block_result(i).is_some(),
            );
            llr.lowest_block_to_fill =
                actualize_lowest_index(llr.lowest_block_to_fill, height, |i| store.has_block(i));
        });
    }
}
