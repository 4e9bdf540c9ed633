//! Gas power check: stake-proportional rate limiting of event emission.
//!
//! A validator's gas power regenerates over real time at a rate scaled by
//! its stake share, within two allocation windows (a slow long-term pool
//! and a fast short-term pool). The check is context-dependent: it needs
//! the self-parent's header and the epoch start time, which is why it runs
//! last in the chain.

use crate::error::{ValidationError, ValidationResult};
use crate::ports::{EpochReader, EventReader};
use shared_types::{Event, Rules, Timestamp, NANOS_PER_SEC};
use std::sync::Arc;

pub struct GasPowerChecker<R: EpochReader, E: EventReader> {
    rules: Rules,
    reader: Arc<R>,
    events: Arc<E>,
}

impl<R: EpochReader, E: EventReader> GasPowerChecker<R, E> {
    pub fn new(rules: Rules, reader: Arc<R>, events: Arc<E>) -> Self {
        Self {
            rules,
            reader,
            events,
        }
    }

    /// Gas power available to the event's creator in `window`, given its
    /// previous event (or the epoch start for a first event).
    pub fn compute_available(&self, event: &Event, window: usize) -> ValidationResult<u64> {
        let validators = self.reader.validators();
        let validator =
            validators
                .get(event.creator)
                .ok_or(ValidationError::UnknownCreator {
                    creator: event.creator,
                    epoch: event.epoch,
                })?;
        let rules = self.rules.window(window);

        let (prev_time, prev_left): (Timestamp, u64) = match &event.self_parent {
            Some(sp) => {
                let parent = self
                    .events
                    .event(sp)
                    .ok_or(ValidationError::UnknownParent { parent: *sp })?;
                (parent.creation_time, parent.gas_power_left.0[window])
            }
            None => (self.reader.epoch_start(), rules.startup_gas),
        };
        if event.creation_time <= prev_time {
            return Err(ValidationError::NonMonotonicTime);
        }
        let elapsed = event.creation_time - prev_time;

        // Stake-share scaled regeneration rate, in gas per second.
        let alloc_per_sec = (rules.alloc_per_sec as u128) * (validator.weight as u128)
            / (validators.total_weight() as u128);
        let regenerated = alloc_per_sec * (elapsed as u128) / (NANOS_PER_SEC as u128);
        let cap = alloc_per_sec * (rules.max_alloc_period as u128) / (NANOS_PER_SEC as u128);

        let available = (prev_left as u128 + regenerated).min(cap);
        Ok(available.min(u64::MAX as u128) as u64)
    }

    pub fn validate(&self, event: &Event) -> ValidationResult<()> {
        for window in 0..2 {
            let available = self.compute_available(event, window)?;
            if event.gas_power_used > available {
                return Err(ValidationError::GasPowerTooHigh {
                    used: event.gas_power_used,
                    available,
                    window,
                });
            }
            let computed = available - event.gas_power_used;
            if event.gas_power_left.0[window] != computed {
                return Err(ValidationError::WrongGasPowerLeft {
                    declared: event.gas_power_left.0[window],
                    computed,
                    window,
                });
            }
        }
        Ok(())
    }
}
