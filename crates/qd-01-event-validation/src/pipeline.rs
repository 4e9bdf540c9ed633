//! The composed validation chain.

use crate::basic::BasicChecker;
use crate::epoch::EpochChecker;
use crate::error::ValidationResult;
use crate::gaspower::GasPowerChecker;
use crate::heavy::HeavyChecker;
use crate::parents::ParentsChecker;
use crate::ports::{DecidedReader, EpochReader, EventReader};
use shared_types::{Event, Rules};
use std::sync::Arc;
use tracing::trace;

/// The five checkers in their fixed order: basic, epoch, parents, heavy,
/// gaspower. Cheap and context-free first; crypto and context-heavy last.
pub struct Checkers<R, E, D>
where
    R: EpochReader,
    E: EventReader,
    D: DecidedReader,
{
    pub basic: BasicChecker,
    pub epoch: EpochChecker<R>,
    pub parents: ParentsChecker<E>,
    pub heavy: HeavyChecker<R, D>,
    pub gaspower: GasPowerChecker<R, E>,
}

impl<R, E, D> Checkers<R, E, D>
where
    R: EpochReader,
    E: EventReader,
    D: DecidedReader,
{
    pub fn new(rules: Rules, epochs: Arc<R>, events: Arc<E>, decided: Arc<D>) -> Self {
        Self {
            basic: BasicChecker::new(rules),
            epoch: EpochChecker::new(Arc::clone(&epochs)),
            parents: ParentsChecker::new(Arc::clone(&events)),
            heavy: HeavyChecker::new(Arc::clone(&epochs), decided),
            gaspower: GasPowerChecker::new(rules, epochs, events),
        }
    }

    /// Run the full chain. Fail-fast: the first rejection stops the
    /// pipeline with no partial indexing.
    pub fn validate(&self, event: &Event) -> ValidationResult<()> {
        self.basic.validate(event)?;
        self.epoch.validate(event)?;
        self.parents.validate(event)?;
        self.heavy.validate(event)?;
        self.gaspower.validate(event)?;
        trace!(id = ?event.id(), creator = %event.creator, "event passed validation chain");
        Ok(())
    }
}
