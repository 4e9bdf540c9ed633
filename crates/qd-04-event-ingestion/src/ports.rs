//! Ports: the ordering engine and the emitter notification seam.

use shared_types::{Epoch, Event, ValidatorSet};

/// The aBFT ordering engine, consumed as a black box.
///
/// `process` may synchronously drive the finalization callbacks before it
/// returns; the service already holds the engine lock at that point, which
/// is exactly the serialization the callbacks rely on.
pub trait OrderingEngine: Send + Sync {
    fn current_epoch(&self) -> Epoch;

    /// Fill the consensus-assigned fields (frame) of a candidate event
    /// during self-emission.
    fn build(&self, event: &mut Event) -> Result<(), String>;

    /// Feed a validated, stored event into ordering.
    fn process(&self, event: &Event) -> Result<(), String>;

    /// Re-key for an epoch the engine did not decide itself (LLR
    /// fast-forward).
    fn reset(&self, epoch: Epoch, validators: &ValidatorSet);
}

/// Notifications the local emitter subscribes to.
pub trait EmitterNotify: Send + Sync {
    /// A new event (own or remote) was connected.
    fn on_event_connected(&self, event: &Event);

    /// The epoch advanced; per-epoch emission state must re-key.
    fn on_new_epoch(&self, epoch: Epoch);
}

/// No-op emitter for nodes that do not emit.
pub struct NullEmitter;

impl EmitterNotify for NullEmitter {
    fn on_event_connected(&self, _event: &Event) {}
    fn on_new_epoch(&self, _epoch: Epoch) {}
}
