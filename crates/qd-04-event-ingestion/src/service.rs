//! The ingestion service.

use crate::context::{StoreDecided, StoreEpochs, StoreEvents};
use crate::error::{IngestError, IngestResult};
use crate::ports::{EmitterNotify, OrderingEngine};
use parking_lot::Mutex;
use qd_01_event_validation::Checkers;
use qd_02_dag_indexer::DagIndexer;
use qd_03_chain_storage::Store;
use qd_06_llr_sync::{LlrProcessor, LlrResult};
use shared_types::{
    Epoch, Event, FullBlockRecord, FullEpochRecord, GasPowerLeft, Rules, SignedBlockVotes,
    SignedEpochVote, FaultClass, LONG_TERM_WINDOW, SHORT_TERM_WINDOW,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything the engine lock guards: the mutable, epoch-scoped core.
struct EngineInner {
    dag_index: DagIndexer,
    epoch: Epoch,
}

/// Rolls back staged index additions unless the stage was flushed.
struct StageGuard<'a> {
    index: &'a mut DagIndexer,
    flushed: bool,
}

impl<'a> StageGuard<'a> {
    fn new(index: &'a mut DagIndexer) -> Self {
        Self {
            index,
            flushed: false,
        }
    }

    fn flush(mut self) {
        self.index.flush();
        self.flushed = true;
    }
}

impl std::ops::Deref for StageGuard<'_> {
    type Target = DagIndexer;
    fn deref(&self) -> &DagIndexer {
        self.index
    }
}

impl std::ops::DerefMut for StageGuard<'_> {
    fn deref_mut(&mut self) -> &mut DagIndexer {
        self.index
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        if !self.flushed {
            self.index.drop_not_flushed();
        }
    }
}

/// The single writer around validation, indexing, consensus submission and
/// LLR processing.
pub struct IngestionService<E, N>
where
    E: OrderingEngine,
    N: EmitterNotify,
{
    store: Arc<Store>,
    engine: Arc<E>,
    emitter: Arc<N>,
    checkers: Checkers<StoreEpochs, StoreEvents, StoreDecided>,
    llr: LlrProcessor,
    inner: Mutex<EngineInner>,
    stopped: AtomicBool,
}

impl<E, N> IngestionService<E, N>
where
    E: OrderingEngine,
    N: EmitterNotify,
{
    pub fn new(rules: Rules, store: Arc<Store>, engine: Arc<E>, emitter: Arc<N>) -> Self {
        let epochs = Arc::new(StoreEpochs::new(Arc::clone(&store)));
        let events = Arc::new(StoreEvents::new(Arc::clone(&store)));
        let decided = Arc::new(StoreDecided::new(Arc::clone(&store)));
        let checkers = Checkers::new(rules, epochs, events, decided);

        let pair = store.block_epoch_state();
        let inner = EngineInner {
            dag_index: DagIndexer::new(
                pair.1.epoch,
                pair.1.epoch_start,
                pair.1.validators.clone(),
            ),
            epoch: pair.1.epoch,
        };
        Self {
            llr: LlrProcessor::new(Arc::clone(&store)),
            store,
            engine,
            emitter,
            checkers,
            inner: Mutex::new(inner),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Process an event received from the network.
    ///
    /// All-or-nothing: either the event ends up stored, indexed and
    /// submitted to consensus, or no trace of it remains.
    pub fn process_event(&self, event: Event) -> IngestResult<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(IngestError::Stopped);
        }
        // Structural checks are context-free; keep them off the lock.
        self.checkers.basic.validate(&event)?;

        let mut inner = self.inner.lock();
        let id = event.id();
        if self.store.has_event(&id) {
            return Err(IngestError::AlreadyConnected { id });
        }
        // Epoch relevance is double-checked under the lock: the epoch may
        // have advanced since the network-level pre-check.
        self.checkers.epoch.validate(&event)?;
        self.checkers.parents.validate(&event)?;
        self.checkers.heavy.validate(&event)?;
        self.checkers.gaspower.validate(&event)?;

        let event = Arc::new(event);
        self.store.add_event(Arc::clone(&event));
        let mut stage = StageGuard::new(&mut inner.dag_index);
        if let Err(e) = stage.add(&event) {
            drop(stage);
            self.store.delete_event(&id);
            return Err(e.into());
        }

        // The claimed median time must equal the derived one exactly; this
        // is a deterministic computation, not an estimate.
        let computed = match stage.median_time(&id) {
            Ok(t) => t,
            Err(e) => {
                drop(stage);
                self.store.delete_event(&id);
                return Err(e.into());
            }
        };
        if computed != event.med_time {
            drop(stage);
            self.store.delete_event(&id);
            return Err(IngestError::WrongMedianTime {
                claimed: event.med_time,
                computed,
            });
        }

        // Hand over to aBFT ordering; this may finalize one or more blocks
        // synchronously before returning.
        if let Err(reason) = self.engine.process(&event) {
            drop(stage);
            self.store.delete_event(&id);
            return Err(IngestError::Consensus { reason });
        }
        stage.flush();

        // Head tracking: parents are no longer heads, this event is.
        let mut heads = self.store.heads(event.epoch);
        heads.retain(|head| !event.parents().any(|p| p == head));
        heads.push(id);
        self.store.set_heads(event.epoch, &heads);
        // Fork-agnostic; only the emitter consumes it.
        self.store.set_last_event(event.epoch, event.creator, id);

        // The event may carry LLR votes; duplicates and stale votes are
        // expected on re-gossip and not an error of the event.
        if let Some(bvs) = &event.block_votes {
            if let Err(e) = self.llr.process_block_votes(bvs) {
                if e.fault_class() != FaultClass::Duplicate {
                    debug!(%e, "event-carried block votes not tallied");
                }
            }
        }
        if let Some(ev) = &event.epoch_vote {
            if let Err(e) = self.llr.process_epoch_vote(ev) {
                if e.fault_class() != FaultClass::Duplicate {
                    debug!(%e, "event-carried epoch vote not tallied");
                }
            }
        }

        self.emitter.on_event_connected(&event);

        let engine_epoch = self.engine.current_epoch();
        if engine_epoch != inner.epoch {
            self.on_new_epoch(&mut inner, engine_epoch);
        }

        drop(inner);
        self.maybe_commit();
        Ok(())
    }

    /// Build a self-emitted event: consensus fields, median time and gas
    /// power stamped; signing is the emitter's job.
    ///
    /// The DAG index addition here is purely speculative, to derive the
    /// median time; it is always rolled back before returning, and the
    /// event re-enters through `process_event` once signed.
    pub fn build_event(&self, mut event: Event) -> IngestResult<Event> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(IngestError::Stopped);
        }
        let mut inner = self.inner.lock();

        event.version = 1;
        self.engine
            .build(&mut event)
            .map_err(|reason| IngestError::Consensus { reason })?;

        event.med_time = {
            let mut stage = StageGuard::new(&mut inner.dag_index);
            stage.add(&event)?;
            stage.median_time(&event.id())?
            // StageGuard drops here: the speculative addition never stays.
        };

        let available = [
            self.checkers
                .gaspower
                .compute_available(&event, LONG_TERM_WINDOW)?,
            self.checkers
                .gaspower
                .compute_available(&event, SHORT_TERM_WINDOW)?,
        ];
        if event.gas_power_used > available[0].min(available[1]) {
            debug!(
                creator = %event.creator,
                used = event.gas_power_used,
                "dropping own event: not enough gas power"
            );
            return Err(IngestError::NotEnoughGasPower);
        }
        event.gas_power_left = GasPowerLeft([
            available[0] - event.gas_power_used,
            available[1] - event.gas_power_used,
        ]);
        event.payload_hash = event.compute_payload_hash();
        Ok(event)
    }

    // --- LLR entry points ---

    /// Tally gossiped block votes. Runs under the engine lock.
    pub fn process_block_votes(&self, bvs: &SignedBlockVotes) -> LlrResult<()> {
        let inner = self.inner.lock();
        let result = self.llr.process_block_votes(bvs);
        drop(inner);
        self.maybe_commit();
        result
    }

    /// Tally a gossiped epoch vote. Runs under the engine lock.
    pub fn process_epoch_vote(&self, ev: &SignedEpochVote) -> LlrResult<()> {
        let inner = self.inner.lock();
        let result = self.llr.process_epoch_vote(ev);
        drop(inner);
        self.maybe_commit();
        result
    }

    /// Import a full block record: validated lock-free, applied under the
    /// engine lock.
    pub fn process_full_block_record(&self, record: &FullBlockRecord) -> LlrResult<()> {
        self.llr.check_block_record(record)?;
        let inner = self.inner.lock();
        let result = self.llr.apply_block_record(record);
        drop(inner);
        self.maybe_commit();
        result
    }

    /// Import a full epoch record: validated lock-free, applied under the
    /// engine lock. Fast-forwarding the epoch re-keys the DAG index and
    /// the ordering engine.
    pub fn process_full_epoch_record(&self, record: &FullEpochRecord) -> LlrResult<()> {
        self.llr.check_epoch_record(record)?;
        let mut inner = self.inner.lock();
        self.llr.apply_epoch_record(record)?;

        let pair = self.store.block_epoch_state();
        if pair.1.epoch != inner.epoch {
            self.engine.reset(pair.1.epoch, &pair.1.validators);
            self.on_new_epoch(&mut inner, pair.1.epoch);
        }
        drop(inner);
        self.maybe_commit();
        Ok(())
    }

    /// Stop accepting input and wait out in-flight processing.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        // Taking the lock waits for any in-flight block processing.
        let _inner = self.inner.lock();
        self.store.commit();
        info!("ingestion service stopped");
    }

    fn on_new_epoch(&self, inner: &mut EngineInner, epoch: Epoch) {
        let pair = self.store.block_epoch_state();
        let old_epoch = inner.epoch;
        inner.epoch = epoch;
        inner
            .dag_index
            .reset(epoch, pair.1.epoch_start, pair.1.validators.clone());
        self.store.drop_epoch_index(old_epoch);
        self.emitter.on_new_epoch(epoch);
        info!(old_epoch, epoch, "epoch advanced");
    }

    fn maybe_commit(&self) {
        if self.store.should_commit() {
            let _inner = self.inner.lock();
            self.store.commit();
            debug!("committed store");
        }
    }

    /// Heads of the current DAG, the parent candidates for emission.
    pub fn heads(&self) -> Vec<shared_types::EventId> {
        let epoch = self.store.block_epoch_state().1.epoch;
        self.store.heads(epoch)
    }

    /// Last connected event of a validator (fork-agnostic, emitter only).
    pub fn last_event_of(&self, validator: shared_types::ValidatorId) -> Option<shared_types::EventId> {
        let epoch = self.store.block_epoch_state().1.epoch;
        self.store.last_event(epoch, validator)
    }
}
