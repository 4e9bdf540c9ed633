//! Outbound ports: the context the validation chain reads from.

use shared_types::{
    BlockHeight, Epoch, Event, EventId, Hash, PublicKey, Timestamp, ValidatorSet, ValidatorId,
};
use std::sync::Arc;

/// Epoch context: the current epoch, its validator set, and per-epoch
/// public keys (validators rotate keys per epoch).
pub trait EpochReader: Send + Sync {
    fn current_epoch(&self) -> Epoch;

    /// Start time of the current epoch.
    fn epoch_start(&self) -> Timestamp;

    /// The current epoch's validator set, as an immutable snapshot.
    fn validators(&self) -> Arc<ValidatorSet>;

    /// Public key of `validator` for `epoch`. Must cover the current epoch;
    /// should cover the liability window of past epochs.
    fn pubkey(&self, epoch: Epoch, validator: ValidatorId) -> Option<PublicKey>;
}

/// Lookup of already-connected events, for parent and gas power checks.
pub trait EventReader: Send + Sync {
    fn event(&self, id: &EventId) -> Option<Arc<Event>>;
}

/// Locally decided LLR results, for wrong-vote misbehaviour proofs.
pub trait DecidedReader: Send + Sync {
    fn decided_block_hash(&self, height: BlockHeight) -> Option<Hash>;
    fn decided_epoch_hash(&self, epoch: Epoch) -> Option<Hash>;
}
