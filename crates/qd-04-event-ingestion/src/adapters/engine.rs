//! A deterministic in-process ordering engine.
//!
//! Confirms events in arrival order and decides a block boundary every
//! `block_interval` processed events (or on demand), with the newest event
//! as the atropos. No Byzantine tolerance, no real aBFT: this adapter
//! exists so the whole pipeline runs and tests end-to-end without the
//! external engine. It honors the callback contract exactly: one
//! `begin_block`, zero or more `apply_event`, one `end_block`, all driven
//! synchronously from inside `process`.

use crate::ports::OrderingEngine;
use parking_lot::{Mutex, RwLock};
use shared_types::{ConsensusBlock, ConsensusCallbacks, Epoch, Event, EventId, ValidatorSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LocalEngine {
    epoch: AtomicU64,
    block_interval: usize,
    callbacks: RwLock<Option<Arc<dyn ConsensusCallbacks>>>,
    pending: Mutex<Vec<Arc<Event>>>,
    /// Events whose apply_event is withheld; exercises the
    /// "atropos never applied" edge for tests.
    withhold_apply: Mutex<Vec<EventId>>,
}

impl LocalEngine {
    pub fn new(epoch: Epoch, block_interval: usize) -> Self {
        Self {
            epoch: AtomicU64::new(epoch),
            block_interval,
            callbacks: RwLock::new(None),
            pending: Mutex::new(Vec::new()),
            withhold_apply: Mutex::new(Vec::new()),
        }
    }

    /// Wire the finalization callbacks. Must happen before any `process`.
    pub fn set_callbacks(&self, callbacks: Arc<dyn ConsensusCallbacks>) {
        *self.callbacks.write() = Some(callbacks);
    }

    /// Skip the `apply_event` call for this event when deciding, as a real
    /// engine does for events subsumed by a later atropos.
    pub fn withhold_apply_of(&self, id: EventId) {
        self.withhold_apply.lock().push(id);
    }

    /// Decide a block over everything pending, newest event as atropos.
    pub fn decide_now(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        if pending.is_empty() {
            return;
        }
        self.decide(pending);
    }

    fn decide(&self, pending: Vec<Arc<Event>>) {
        let Some(callbacks) = self.callbacks.read().clone() else {
            warn!("no finalization callbacks wired; dropping decided batch");
            return;
        };
        let atropos = pending.last().map(|e| e.id()).unwrap_or_default();
        debug!(events = pending.len(), ?atropos, "deciding block");

        callbacks.begin_block(ConsensusBlock {
            atropos,
            cheaters: Vec::new(),
        });
        let withheld = std::mem::take(&mut *self.withhold_apply.lock());
        for event in &pending {
            if !withheld.contains(&event.id()) {
                callbacks.apply_event(event);
            }
        }
        if callbacks.end_block().is_some() {
            self.epoch.fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl OrderingEngine for LocalEngine {
    fn current_epoch(&self) -> Epoch {
        self.epoch.load(Ordering::Acquire)
    }

    fn build(&self, event: &mut Event) -> Result<(), String> {
        // Frames approximate rounds: one per pending batch position.
        event.frame = self.pending.lock().len() as u32 + 1;
        Ok(())
    }

    fn process(&self, event: &Event) -> Result<(), String> {
        if self.callbacks.read().is_none() {
            return Err("finalization callbacks not wired".to_string());
        }
        let decided = {
            let mut pending = self.pending.lock();
            pending.push(Arc::new(event.clone()));
            if pending.len() >= self.block_interval {
                Some(std::mem::take(&mut *pending))
            } else {
                None
            }
        };
        if let Some(batch) = decided {
            self.decide(batch);
        }
        Ok(())
    }

    fn reset(&self, epoch: Epoch, _validators: &ValidatorSet) {
        self.epoch.store(epoch, Ordering::Release);
        self.pending.lock().clear();
        debug!(epoch, "ordering engine re-keyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PMutex;

    #[derive(Default)]
    struct RecordingCallbacks {
        calls: PMutex<Vec<&'static str>>,
    }

    impl ConsensusCallbacks for RecordingCallbacks {
        fn begin_block(&self, _block: ConsensusBlock) {
            self.calls.lock().push("begin");
        }
        fn apply_event(&self, _event: &Event) {
            self.calls.lock().push("apply");
        }
        fn end_block(&self) -> Option<ValidatorSet> {
            self.calls.lock().push("end");
            None
        }
    }

    fn event(seq: u32) -> Event {
        Event {
            epoch: 1,
            seq,
            lamport: seq as u64,
            creation_time: 1,
            med_time: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_decides_every_interval() {
        let engine = LocalEngine::new(1, 2);
        let callbacks = Arc::new(RecordingCallbacks::default());
        engine.set_callbacks(Arc::clone(&callbacks) as Arc<dyn ConsensusCallbacks>);

        engine.process(&event(1)).unwrap();
        assert!(callbacks.calls.lock().is_empty());
        engine.process(&event(2)).unwrap();
        assert_eq!(
            *callbacks.calls.lock(),
            vec!["begin", "apply", "apply", "end"]
        );
    }

    #[test]
    fn test_unwired_engine_rejects() {
        let engine = LocalEngine::new(1, 2);
        assert!(engine.process(&event(1)).is_err());
    }

    #[test]
    fn test_withheld_apply_is_skipped() {
        let engine = LocalEngine::new(1, 8);
        let callbacks = Arc::new(RecordingCallbacks::default());
        engine.set_callbacks(Arc::clone(&callbacks) as Arc<dyn ConsensusCallbacks>);

        let e = event(1);
        engine.withhold_apply_of(e.id());
        engine.process(&e).unwrap();
        engine.decide_now();
        assert_eq!(*callbacks.calls.lock(), vec!["begin", "end"]);
    }
}
