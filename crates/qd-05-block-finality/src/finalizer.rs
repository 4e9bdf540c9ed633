//! The finalization state machine.

use crate::events_module;
use crate::ordering::{collect_txs, sort_events, spill};
use crate::ports::{BlockContext, ChainFeed, ExecutionEnv, ProtocolTxSource};
use crate::sealing;
use parking_lot::Mutex;
use qd_03_chain_storage::{Store, TxPosition};
use qd_06_llr_sync::LlrProcessor;
use shared_types::{
    Block, BlockState, ConsensusBlock, ConsensusCallbacks, EpochState, Event, EventId,
    FullBlockRecord, FullEpochRecord, LogEntry, Receipt, Rules, SignedTransaction, ValidatorSet,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// A determinism break: the block boundary is already agreed network-wide,
/// so a local failure to finalize it makes further participation unsafe.
macro_rules! crit {
    ($($arg:tt)*) => {{
        tracing::error!($($arg)*);
        panic!("block finalization invariant violated");
    }};
}

/// Explicit finalization phases; the callbacks move the machine
/// `Idle → Accumulating → Idle` once per decided block.
enum FinalizerPhase {
    Idle,
    Accumulating(Box<BlockCtx>),
}

/// Everything threaded between `begin_block`, `apply_event` and
/// `end_block` for one decided block.
struct BlockCtx {
    block_state: BlockState,
    epoch_state: EpochState,
    decided: ConsensusBlock,
    /// The atropos, when `apply_event` saw it. It may legitimately never
    /// be applied (its confirmation subsumed by a later atropos), in which
    /// case `end_block` falls back to a store lookup.
    atropos: Option<Arc<Event>>,
    /// Confirmed tx-bearing events, accumulation order.
    confirmed: Vec<Arc<Event>>,
    confirmed_count: usize,
}

/// Drives a decided batch of events into a finalized EVM block.
pub struct BlockFinalizer<X, F, P>
where
    X: ExecutionEnv,
    F: ChainFeed,
    P: ProtocolTxSource,
{
    store: Arc<Store>,
    exec: Arc<X>,
    feed: Arc<F>,
    protocol: Arc<P>,
    rules: Rules,
    llr: LlrProcessor,
    /// Index transactions/receipts/logs for API lookups.
    tx_index: bool,
    phase: Mutex<FinalizerPhase>,
}

impl<X, F, P> BlockFinalizer<X, F, P>
where
    X: ExecutionEnv,
    F: ChainFeed,
    P: ProtocolTxSource,
{
    pub fn new(
        store: Arc<Store>,
        exec: Arc<X>,
        feed: Arc<F>,
        protocol: Arc<P>,
        rules: Rules,
        tx_index: bool,
    ) -> Self {
        Self {
            llr: LlrProcessor::new(Arc::clone(&store)),
            store,
            exec,
            feed,
            protocol,
            rules,
            tx_index,
            phase: Mutex::new(FinalizerPhase::Idle),
        }
    }

    /// Attribute executed receipts back to the originating validators:
    /// refund unused gas power, accrue origination score.
    fn account_receipts(
        block_state: &mut BlockState,
        epoch_state: &EpochState,
        receipts: &[Receipt],
        executed: &[(SignedTransaction, EventId)],
        creators: &HashMap<EventId, shared_types::ValidatorId>,
    ) {
        if receipts.len() != executed.len() {
            crit!(
                receipts = receipts.len(),
                executed = executed.len(),
                "receipt count does not match executed transactions"
            );
        }
        for (receipt, (tx, owner)) in receipts.iter().zip(executed.iter()) {
            if receipt.gas_used > tx.gas_limit {
                // Declared gas must bound actual gas; a violation means the
                // execution layer and our accounting have diverged.
                crit!(
                    gas_used = receipt.gas_used,
                    gas_limit = tx.gas_limit,
                    "receipt gas exceeds the transaction's declared limit"
                );
            }
            let Some(creator) = creators.get(owner) else {
                crit!(event = ?owner, "executed transaction from unknown event");
            };
            if let Some(idx) = epoch_state.validators.index_of(*creator) {
                let vs = &mut block_state.validators[idx];
                vs.gas_refund += tx.gas_limit - receipt.gas_used;
                vs.origination_score += receipt.gas_used;
            }
        }
    }
}

impl<X, F, P> ConsensusCallbacks for BlockFinalizer<X, F, P>
where
    X: ExecutionEnv,
    F: ChainFeed,
    P: ProtocolTxSource,
{
    fn begin_block(&self, decided: ConsensusBlock) {
        let mut phase = self.phase.lock();
        if !matches!(*phase, FinalizerPhase::Idle) {
            crit!("begin_block while a block is already being finalized");
        }
        let pair = self.store.block_epoch_state();
        let mut block_state = pair.0.clone();
        let epoch_state = pair.1.clone();

        for cheater in &decided.cheaters {
            if !block_state.cheaters.contains(cheater) {
                block_state.cheaters.push(*cheater);
            }
        }
        *phase = FinalizerPhase::Accumulating(Box::new(BlockCtx {
            block_state,
            epoch_state,
            decided,
            atropos: None,
            confirmed: Vec::new(),
            confirmed_count: 0,
        }));
    }

    fn apply_event(&self, event: &Event) {
        let mut phase = self.phase.lock();
        let FinalizerPhase::Accumulating(ctx) = &mut *phase else {
            crit!("apply_event outside a block");
        };
        let id = event.id();
        let arc = self
            .store
            .event(&id)
            .unwrap_or_else(|| Arc::new(event.clone()));

        if id == ctx.decided.atropos {
            ctx.atropos = Some(Arc::clone(&arc));
        }
        // Confirmed misbehaviour proofs convict their accused; the next
        // epoch seal prunes them from the validator set.
        for mp in &event.misbehaviour_proofs {
            for accused in mp.accused() {
                if !ctx.block_state.cheaters.contains(&accused) {
                    ctx.block_state.cheaters.push(accused);
                }
            }
        }
        events_module::apply_event(&mut ctx.block_state, &ctx.epoch_state, event);
        ctx.confirmed_count += 1;
        if !event.transactions.is_empty() {
            ctx.confirmed.push(arc);
        }
    }

    fn end_block(&self) -> Option<ValidatorSet> {
        let mut phase = self.phase.lock();
        let FinalizerPhase::Accumulating(ctx) = std::mem::replace(&mut *phase, FinalizerPhase::Idle)
        else {
            crit!("end_block outside a block");
        };
        let BlockCtx {
            mut block_state,
            epoch_state,
            decided,
            atropos,
            confirmed,
            confirmed_count,
        } = *ctx;

        // The atropos may never have passed through apply_event.
        let atropos_event = match atropos.or_else(|| self.store.event(&decided.atropos)) {
            Some(e) => e,
            None => crit!(atropos = ?decided.atropos, "atropos event missing from store"),
        };
        let height = block_state.last_block + 1;
        let time = atropos_event.med_time;
        block_state.epoch_blocks += 1;

        let sealing_now = sealing::should_seal(&block_state, &epoch_state, time, &self.rules);

        let exec_ctx = BlockContext {
            height,
            time,
            atropos: decided.atropos,
            prev_root: block_state.final_state_root,
        };
        let mut session = match self.exec.begin(&exec_ctx) {
            Ok(s) => s,
            Err(e) => crit!(%e, height, "failed to open execution session"),
        };

        // Protocol transactions that must precede everything else.
        let pre_txs = self.protocol.pre_seal_txs(&block_state, &epoch_state);
        let pre_outcome = match session.execute(&pre_txs, true) {
            Ok(o) => o,
            Err(e) => crit!(%e, height, "pre-seal internal transaction failed"),
        };

        // Seal the epoch if due: the only point the validator set may swap.
        let old_epoch = epoch_state.epoch;
        let (mut block_state, epoch_state) = if sealing_now {
            let (bs, es) = sealing::seal_epoch(&block_state, &epoch_state, time);
            (bs, es)
        } else {
            (block_state, epoch_state)
        };
        let new_validators = sealing_now.then(|| epoch_state.validators.clone());

        // Post-seal protocol transactions (reward distribution). Runs after
        // the seal decision point so a consumer of `new_validators` could
        // pipeline ahead of it.
        let post_txs = self
            .protocol
            .post_seal_txs(&block_state, &epoch_state, sealing_now);
        let post_outcome = match session.execute(&post_txs, true) {
            Ok(o) => o,
            Err(e) => crit!(%e, height, "post-seal internal transaction failed"),
        };

        // Deterministic ordering: Lamport-sorted, gas-spilled suffix.
        let sorted = sort_events(confirmed);
        let (kept, spilled) = spill(sorted, self.rules.blocks.block_gas_hard_limit);
        if spilled > 0 {
            debug!(height, spilled, "events spilled into a later block by the gas hard limit");
        }

        let creators: HashMap<EventId, shared_types::ValidatorId> =
            kept.iter().map(|e| (e.id(), e.creator)).collect();
        let attribution = collect_txs(&kept);
        let outcome = match session.execute(&attribution.txs, false) {
            Ok(o) => o,
            Err(e) => crit!(%e, height, "block transaction execution failed"),
        };

        // Transaction positions survive skip-filtering; each keeps its
        // first-occurrence owning event.
        let skipped: HashSet<u32> = outcome.skipped.iter().copied().collect();
        let executed: Vec<(SignedTransaction, EventId)> = attribution
            .txs
            .into_iter()
            .zip(attribution.owners)
            .enumerate()
            .filter(|(i, _)| !skipped.contains(&(*i as u32)))
            .map(|(_, pair)| pair)
            .collect();

        Self::account_receipts(
            &mut block_state,
            &epoch_state,
            &outcome.receipts,
            &executed,
            &creators,
        );

        let state_root = match session.commit() {
            Ok(root) => root,
            Err(e) => crit!(%e, height, "state commit failed"),
        };

        let internal_tx_hashes: Vec<_> = pre_txs
            .iter()
            .chain(post_txs.iter())
            .map(|tx| tx.hash())
            .collect();
        let executed_txs: Vec<SignedTransaction> =
            executed.iter().map(|(tx, _)| tx.clone()).collect();
        let block = Arc::new(Block {
            height,
            atropos: decided.atropos,
            events: kept.iter().map(|e| e.id()).collect(),
            transactions: executed_txs.iter().map(|tx| tx.hash()).collect(),
            internal_tx_hashes,
            state_root,
            gas_used: pre_outcome.gas_used + post_outcome.gas_used + outcome.gas_used,
            skipped_txs: outcome.skipped.clone(),
            time,
        });

        block_state.last_block = height;
        block_state.last_block_time = time;
        block_state.final_state_root = state_root;

        // Persist, then notify.
        self.store.set_block(Arc::clone(&block));
        let all_receipts: Vec<Receipt> = pre_outcome
            .receipts
            .into_iter()
            .chain(post_outcome.receipts)
            .chain(outcome.receipts.iter().cloned())
            .collect();
        self.store.set_receipts(height, &all_receipts);
        if self.tx_index {
            for (offset, (tx, owner)) in executed.iter().enumerate() {
                self.store.set_tx_position(
                    &tx.hash(),
                    &TxPosition {
                        block: height,
                        event: Some(*owner),
                        offset: offset as u32,
                    },
                );
            }
        }
        if sealing_now {
            self.store.set_historical_epoch_state(&epoch_state);
        }
        self.store
            .set_block_epoch_state(block_state.clone(), epoch_state.clone());

        // Our own results feed the LLR track without waiting for votes.
        let record = FullBlockRecord {
            block: (*block).clone(),
            txs: executed_txs.clone(),
        };
        self.llr.on_own_block(&block, record.hash());
        if sealing_now {
            let epoch_record = FullEpochRecord {
                block_state,
                epoch_state,
            };
            self.llr
                .on_own_epoch(epoch_record.hash(), epoch_record.epoch());
        }

        self.feed.new_block(&block);
        if !executed_txs.is_empty() {
            self.feed.new_txs(&executed_txs);
        }
        let logs: Vec<LogEntry> = outcome
            .receipts
            .iter()
            .flat_map(|r| r.logs.iter().cloned())
            .collect();
        if !logs.is_empty() {
            self.feed.new_logs(&logs);
        }

        info!(
            height,
            confirmed = confirmed_count,
            included = block.events.len(),
            txs = block.transactions.len(),
            sealed = sealing_now,
            old_epoch,
            "finalized block"
        );
        new_validators
    }
}
