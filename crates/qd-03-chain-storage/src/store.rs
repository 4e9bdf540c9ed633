//! The typed store: chain tables over the key-value abstraction.

use crate::kv::KvStore;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{
    Block, BlockHeight, BlockState, Epoch, EpochState, Event, EventId, FlushRules, Hash, LlrState,
    Receipt, ValidatorId,
};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

// Table prefixes. One byte, ordered roughly by access frequency.
const T_EVENT: u8 = 0x01;
const T_HEADS: u8 = 0x02;
const T_LAST_EVENT: u8 = 0x03;
const T_BLOCK: u8 = 0x04;
const T_STATE: u8 = 0x05;
const T_EPOCH_STATE: u8 = 0x06;
const T_BV_WEIGHT: u8 = 0x07;
const T_BV_RESULT: u8 = 0x08;
const T_EV_WEIGHT: u8 = 0x09;
const T_EV_RESULT: u8 = 0x0a;
const T_LLR_STATE: u8 = 0x0b;
const T_BV_SEEN: u8 = 0x0c;
const T_EV_SEEN: u8 = 0x0d;
const T_RECEIPTS: u8 = 0x0e;
const T_TX_POSITION: u8 = 0x0f;

const EVENT_CACHE: usize = 4096;
const BLOCK_CACHE: usize = 1024;

/// Where a transaction landed: its owning event (unknown for LLR-imported
/// blocks) and final block offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxPosition {
    pub block: BlockHeight,
    pub event: Option<EventId>,
    pub offset: u32,
}

/// The chain store.
///
/// Single-writer with respect to consensus state (the engine lock upstream
/// serializes all mutations); reads are safe from any thread and served
/// from caches or atomic snapshots where possible.
pub struct Store {
    kv: Arc<dyn KvStore>,
    flush: FlushRules,

    event_cache: Mutex<LruCache<EventId, Arc<Event>>>,
    block_cache: Mutex<LruCache<BlockHeight, Arc<Block>>>,

    /// The current (BlockState, EpochState) pair, swapped as one unit.
    current: RwLock<Option<Arc<(BlockState, EpochState)>>>,

    /// Serializes LLR watermark read-modify-writes.
    llr: Mutex<()>,

    dirty_bytes: AtomicU64,
    last_commit: Mutex<Instant>,
}

fn key1(table: u8, suffix: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + suffix.len());
    k.push(table);
    k.extend_from_slice(suffix);
    k
}

fn key2(table: u8, a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + a.len() + b.len());
    k.push(table);
    k.extend_from_slice(a);
    k.extend_from_slice(b);
    k
}

/// A decode failure in our own tables is a determinism break, not an error
/// to propagate.
fn corrupt(table: &'static str) -> ! {
    error!(table, "corrupt record in chain store");
    panic!("corrupt record in chain store table {table}");
}

impl Store {
    pub fn new(kv: Arc<dyn KvStore>, flush: FlushRules) -> Self {
        Self {
            kv,
            flush,
            event_cache: Mutex::new(LruCache::new(NonZeroUsize::new(EVENT_CACHE).unwrap())),
            block_cache: Mutex::new(LruCache::new(NonZeroUsize::new(BLOCK_CACHE).unwrap())),
            current: RwLock::new(None),
            llr: Mutex::new(()),
            dirty_bytes: AtomicU64::new(0),
            last_commit: Mutex::new(Instant::now()),
        }
    }

    fn put<T: Serialize>(&self, key: Vec<u8>, value: &T) {
        let bytes = match bincode::serialize(value) {
            Ok(b) => b,
            Err(_) => corrupt("encode"),
        };
        self.dirty_bytes
            .fetch_add((key.len() + bytes.len()) as u64, Ordering::Relaxed);
        self.kv.put(key, bytes);
    }

    fn get<T: DeserializeOwned>(&self, key: &[u8], table: &'static str) -> Option<T> {
        let bytes = self.kv.get(key)?;
        match bincode::deserialize(&bytes) {
            Ok(v) => Some(v),
            Err(_) => corrupt(table),
        }
    }

    // --- events ---

    pub fn add_event(&self, event: Arc<Event>) {
        let id = event.id();
        self.put(key1(T_EVENT, &id.0), event.as_ref());
        self.event_cache.lock().put(id, event);
    }

    pub fn has_event(&self, id: &EventId) -> bool {
        self.event_cache.lock().contains(id) || self.kv.get(&key1(T_EVENT, &id.0)).is_some()
    }

    pub fn event(&self, id: &EventId) -> Option<Arc<Event>> {
        if let Some(e) = self.event_cache.lock().get(id) {
            return Some(Arc::clone(e));
        }
        let event: Event = self.get(&key1(T_EVENT, &id.0), "events")?;
        let event = Arc::new(event);
        self.event_cache.lock().put(*id, Arc::clone(&event));
        Some(event)
    }

    /// Remove a speculatively stored event (ingestion rollback).
    pub fn delete_event(&self, id: &EventId) {
        self.kv.delete(&key1(T_EVENT, &id.0));
        self.event_cache.lock().pop(id);
    }

    // --- per-epoch DAG index: heads and last events ---

    pub fn heads(&self, epoch: Epoch) -> Vec<EventId> {
        self.get(&key1(T_HEADS, &epoch.to_be_bytes()), "heads")
            .unwrap_or_default()
    }

    pub fn set_heads(&self, epoch: Epoch, heads: &Vec<EventId>) {
        self.put(key1(T_HEADS, &epoch.to_be_bytes()), heads);
    }

    pub fn last_event(&self, epoch: Epoch, validator: ValidatorId) -> Option<EventId> {
        self.get(
            &key2(
                T_LAST_EVENT,
                &epoch.to_be_bytes(),
                &validator.0.to_be_bytes(),
            ),
            "last_events",
        )
    }

    pub fn set_last_event(&self, epoch: Epoch, validator: ValidatorId, id: EventId) {
        self.put(
            key2(
                T_LAST_EVENT,
                &epoch.to_be_bytes(),
                &validator.0.to_be_bytes(),
            ),
            &id,
        );
    }

    /// Discard the per-epoch sub-stores of an ended epoch.
    pub fn drop_epoch_index(&self, epoch: Epoch) {
        for table in [T_HEADS, T_LAST_EVENT] {
            let prefix = key1(table, &epoch.to_be_bytes());
            for (k, _) in self.kv.iter_prefix(&prefix) {
                self.kv.delete(&k);
            }
        }
    }

    // --- blocks ---

    pub fn set_block(&self, block: Arc<Block>) {
        self.put(key1(T_BLOCK, &block.height.to_be_bytes()), block.as_ref());
        self.block_cache.lock().put(block.height, block);
    }

    pub fn block(&self, height: BlockHeight) -> Option<Arc<Block>> {
        if let Some(b) = self.block_cache.lock().get(&height) {
            return Some(Arc::clone(b));
        }
        let block: Block = self.get(&key1(T_BLOCK, &height.to_be_bytes()), "blocks")?;
        let block = Arc::new(block);
        self.block_cache.lock().put(height, Arc::clone(&block));
        Some(block)
    }

    pub fn has_block(&self, height: BlockHeight) -> bool {
        self.block_cache.lock().contains(&height)
            || self.kv.get(&key1(T_BLOCK, &height.to_be_bytes())).is_some()
    }

    pub fn set_receipts(&self, height: BlockHeight, receipts: &Vec<Receipt>) {
        self.put(key1(T_RECEIPTS, &height.to_be_bytes()), receipts);
    }

    pub fn receipts(&self, height: BlockHeight) -> Option<Vec<Receipt>> {
        self.get(&key1(T_RECEIPTS, &height.to_be_bytes()), "receipts")
    }

    pub fn set_tx_position(&self, tx: &Hash, position: &TxPosition) {
        self.put(key1(T_TX_POSITION, tx), position);
    }

    pub fn tx_position(&self, tx: &Hash) -> Option<TxPosition> {
        self.get(&key1(T_TX_POSITION, tx), "tx_positions")
    }

    // --- decided consensus state ---

    /// The current (BlockState, EpochState) pair as one immutable snapshot.
    /// Readers never observe a torn combination.
    pub fn block_epoch_state(&self) -> Arc<(BlockState, EpochState)> {
        if let Some(current) = self.current.read().as_ref() {
            return Arc::clone(current);
        }
        // Cold start: fall through to the persisted copy.
        let pair: (BlockState, EpochState) = match self.get(&[T_STATE], "state") {
            Some(pair) => pair,
            None => corrupt("state"),
        };
        let pair = Arc::new(pair);
        *self.current.write() = Some(Arc::clone(&pair));
        pair
    }

    /// Swap in a new decided state pair and persist it.
    pub fn set_block_epoch_state(&self, block_state: BlockState, epoch_state: EpochState) {
        let pair = Arc::new((block_state, epoch_state));
        self.put(vec![T_STATE], pair.as_ref());
        *self.current.write() = Some(pair);
    }

    pub fn has_block_epoch_state(&self) -> bool {
        self.current.read().is_some() || self.kv.get(&[T_STATE]).is_some()
    }

    /// Keep an epoch's sealed state for historical validator-set lookups
    /// (LLR vote weights, misbehaviour-proof keys).
    pub fn set_historical_epoch_state(&self, epoch_state: &EpochState) {
        self.put(
            key1(T_EPOCH_STATE, &epoch_state.epoch.to_be_bytes()),
            epoch_state,
        );
    }

    pub fn historical_epoch_state(&self, epoch: Epoch) -> Option<EpochState> {
        self.get(&key1(T_EPOCH_STATE, &epoch.to_be_bytes()), "epoch_states")
    }

    // --- LLR vote tallies ---

    pub fn block_vote_weight(&self, height: BlockHeight, candidate: &Hash) -> u64 {
        self.get(
            &key2(T_BV_WEIGHT, &height.to_be_bytes(), candidate),
            "bv_weights",
        )
        .unwrap_or(0)
    }

    pub fn set_block_vote_weight(&self, height: BlockHeight, candidate: &Hash, weight: u64) {
        self.put(key2(T_BV_WEIGHT, &height.to_be_bytes(), candidate), &weight);
    }

    pub fn block_result(&self, height: BlockHeight) -> Option<Hash> {
        self.get(&key1(T_BV_RESULT, &height.to_be_bytes()), "bv_results")
    }

    pub fn set_block_result(&self, height: BlockHeight, result: &Hash) {
        self.put(key1(T_BV_RESULT, &height.to_be_bytes()), result);
    }

    pub fn epoch_vote_weight(&self, epoch: Epoch, candidate: &Hash) -> u64 {
        self.get(
            &key2(T_EV_WEIGHT, &epoch.to_be_bytes(), candidate),
            "ev_weights",
        )
        .unwrap_or(0)
    }

    pub fn set_epoch_vote_weight(&self, epoch: Epoch, candidate: &Hash, weight: u64) {
        self.put(key2(T_EV_WEIGHT, &epoch.to_be_bytes(), candidate), &weight);
    }

    pub fn epoch_result(&self, epoch: Epoch) -> Option<Hash> {
        self.get(&key1(T_EV_RESULT, &epoch.to_be_bytes()), "ev_results")
    }

    pub fn set_epoch_result(&self, epoch: Epoch, result: &Hash) {
        self.put(key1(T_EV_RESULT, &epoch.to_be_bytes()), result);
    }

    // --- LLR dedupe marks ---

    pub fn has_processed_block_votes(
        &self,
        creator: ValidatorId,
        epoch: Epoch,
        start: BlockHeight,
    ) -> bool {
        let suffix = [
            creator.0.to_be_bytes().as_slice(),
            epoch.to_be_bytes().as_slice(),
            start.to_be_bytes().as_slice(),
        ]
        .concat();
        self.kv.get(&key1(T_BV_SEEN, &suffix)).is_some()
    }

    pub fn mark_processed_block_votes(
        &self,
        creator: ValidatorId,
        epoch: Epoch,
        start: BlockHeight,
    ) {
        let suffix = [
            creator.0.to_be_bytes().as_slice(),
            epoch.to_be_bytes().as_slice(),
            start.to_be_bytes().as_slice(),
        ]
        .concat();
        self.put(key1(T_BV_SEEN, &suffix), &());
    }

    pub fn has_processed_epoch_vote(&self, creator: ValidatorId, epoch: Epoch) -> bool {
        let suffix = [
            creator.0.to_be_bytes().as_slice(),
            epoch.to_be_bytes().as_slice(),
        ]
        .concat();
        self.kv.get(&key1(T_EV_SEEN, &suffix)).is_some()
    }

    pub fn mark_processed_epoch_vote(&self, creator: ValidatorId, epoch: Epoch) {
        let suffix = [
            creator.0.to_be_bytes().as_slice(),
            epoch.to_be_bytes().as_slice(),
        ]
        .concat();
        self.put(key1(T_EV_SEEN, &suffix), &());
    }

    // --- LLR watermarks ---

    pub fn llr_state(&self) -> LlrState {
        self.get(&[T_LLR_STATE], "llr_state").unwrap_or_default()
    }

    /// Guarded read-modify-write over the LLR watermarks, preventing lost
    /// updates from concurrent vote/record processing.
    pub fn modify_llr_state(&self, f: impl FnOnce(&mut LlrState)) {
        let _guard = self.llr.lock();
        let mut state = self.llr_state();
        f(&mut state);
        self.put(vec![T_LLR_STATE], &state);
    }

    // --- commit thresholds ---

    pub fn dirty_bytes(&self) -> u64 {
        self.dirty_bytes.load(Ordering::Relaxed)
    }

    /// True once enough time has passed or enough dirty data accumulated.
    pub fn should_commit(&self) -> bool {
        if self.dirty_bytes.load(Ordering::Relaxed) >= self.flush.dirty_bytes {
            return true;
        }
        let elapsed = self.last_commit.lock().elapsed();
        elapsed.as_nanos() as u64 >= self.flush.period
    }

    /// Flush the backend and reset the thresholds.
    pub fn commit(&self) {
        self.kv.flush();
        self.dirty_bytes.store(0, Ordering::Relaxed);
        *self.last_commit.lock() = Instant::now();
    }
}
