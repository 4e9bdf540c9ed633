//! The callback seam between the ordering engine and block finalization.
//!
//! The aBFT engine is a black box that totally orders the DAG. When it
//! decides a block boundary it drives these callbacks, in order: one
//! `begin_block`, zero or more `apply_event` (engine-determined order, not
//! final transaction order), one `end_block`. The atropos itself may never
//! be passed to `apply_event` when its confirmation is subsumed by a later
//! atropos; `end_block` must tolerate that.

use crate::entities::Event;
use crate::ids::EventId;
use crate::validators::ValidatorSet;
use crate::ValidatorId;

/// A decided block boundary as named by the ordering engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusBlock {
    /// The deciding event.
    pub atropos: EventId,
    /// Validators the engine observed forking within this batch.
    pub cheaters: Vec<ValidatorId>,
}

/// Finalization callbacks supplied to the ordering engine.
///
/// The engine invokes these synchronously from inside its `process` call,
/// which already runs under the engine lock; implementations must not try to
/// re-acquire it.
pub trait ConsensusCallbacks: Send + Sync {
    fn begin_block(&self, block: ConsensusBlock);

    /// Called once per event the engine confirms as belonging to the current
    /// block.
    fn apply_event(&self, event: &Event);

    /// Close the block: order, execute, seal, persist. Returns the new
    /// validator set when an epoch seal occurred.
    fn end_block(&self) -> Option<ValidatorSet>;
}
