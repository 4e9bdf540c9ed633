//! Validation-port adapters over the chain store.
//!
//! The epoch context reads the store's atomic state snapshot on every
//! call, so an epoch seal re-keys every checker (validator set, public
//! keys, gas power anchors) in one swap.

use qd_01_event_validation::{DecidedReader, EpochReader, EventReader};
use qd_03_chain_storage::Store;
use shared_types::{
    BlockHeight, Epoch, Event, EventId, Hash, PublicKey, Timestamp, ValidatorId, ValidatorSet,
};
use std::sync::Arc;

/// Current-epoch context plus historical public keys.
pub struct StoreEpochs {
    store: Arc<Store>,
}

impl StoreEpochs {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl EpochReader for StoreEpochs {
    fn current_epoch(&self) -> Epoch {
        self.store.block_epoch_state().1.epoch
    }

    fn epoch_start(&self) -> Timestamp {
        self.store.block_epoch_state().1.epoch_start
    }

    fn validators(&self) -> Arc<ValidatorSet> {
        Arc::new(self.store.block_epoch_state().1.validators.clone())
    }

    fn pubkey(&self, epoch: Epoch, validator: ValidatorId) -> Option<PublicKey> {
        let pair = self.store.block_epoch_state();
        if pair.1.epoch == epoch {
            return pair.1.validators.get(validator).map(|v| v.pubkey);
        }
        self.store
            .historical_epoch_state(epoch)?
            .validators
            .get(validator)
            .map(|v| v.pubkey)
    }
}

/// Connected-event lookup.
pub struct StoreEvents {
    store: Arc<Store>,
}

impl StoreEvents {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl EventReader for StoreEvents {
    fn event(&self, id: &EventId) -> Option<Arc<Event>> {
        self.store.event(id)
    }
}

/// Locally decided LLR results, for wrong-vote misbehaviour proofs.
pub struct StoreDecided {
    store: Arc<Store>,
}

impl StoreDecided {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl DecidedReader for StoreDecided {
    fn decided_block_hash(&self, height: BlockHeight) -> Option<Hash> {
        self.store.block_result(height)
    }

    fn decided_epoch_hash(&self, epoch: Epoch) -> Option<Hash> {
        self.store.epoch_result(epoch)
    }
}
