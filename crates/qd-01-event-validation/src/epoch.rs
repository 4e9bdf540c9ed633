//! Epoch relevance check.

use crate::error::{ValidationError, ValidationResult};
use crate::ports::EpochReader;
use shared_types::Event;
use std::sync::Arc;

/// Rejects events that do not belong to the engine's current epoch, with a
/// dedicated error letting the caller re-queue them for a later epoch, and
/// events from creators outside the current validator set.
pub struct EpochChecker<R: EpochReader> {
    reader: Arc<R>,
}

impl<R: EpochReader> EpochChecker<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    pub fn validate(&self, event: &Event) -> ValidationResult<()> {
        let current = self.reader.current_epoch();
        if event.epoch != current {
            return Err(ValidationError::NotRelevant {
                epoch: event.epoch,
                current,
            });
        }
        if !self.reader.validators().contains(event.creator) {
            return Err(ValidationError::UnknownCreator {
                creator: event.creator,
                epoch: event.epoch,
            });
        }
        Ok(())
    }
}
