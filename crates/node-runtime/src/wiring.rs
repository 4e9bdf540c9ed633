//! Subsystem assembly.

use crate::genesis::GenesisSpec;
use qd_03_chain_storage::{InMemoryKv, Store};
use qd_04_event_ingestion::{bootstrap_genesis, IngestionService, LocalEngine, NullEmitter};
use qd_05_block_finality::{BlockFinalizer, BroadcastFeed, NoProtocolTxs, TransferLedger};
use shared_crypto::Keypair;
use shared_types::{Event, EventId, Rules, SignedTransaction, Timestamp, ValidatorId};
use std::sync::Arc;
use tracing::info;

/// A fully wired single-process node.
pub struct Node {
    pub store: Arc<Store>,
    pub engine: Arc<LocalEngine>,
    pub service: Arc<IngestionService<LocalEngine, NullEmitter>>,
    pub ledger: Arc<TransferLedger>,
    pub feed: Arc<BroadcastFeed>,
}

impl Node {
    /// Build, sign and ingest one event on top of the current DAG heads.
    /// The local emitter path: parent selection, seq/lamport derivation,
    /// then `build_event` → sign → `process_event`.
    pub fn emit(
        &self,
        key: &Keypair,
        creator: ValidatorId,
        transactions: Vec<SignedTransaction>,
        time: Timestamp,
    ) -> anyhow::Result<EventId> {
        let epoch = self.store.block_epoch_state().1.epoch;

        let self_parent = self.service.last_event_of(creator);
        let other_parents: Vec<_> = self
            .service
            .heads()
            .into_iter()
            .filter(|h| Some(*h) != self_parent)
            .collect();
        let seq = match &self_parent {
            Some(id) => {
                self.store
                    .event(id)
                    .ok_or_else(|| anyhow::anyhow!("missing self-parent"))?
                    .seq
                    + 1
            }
            None => 1,
        };
        let max_parent_lamport = self_parent
            .iter()
            .chain(other_parents.iter())
            .filter_map(|id| self.store.event(id))
            .map(|e| e.lamport)
            .max()
            .unwrap_or(0);
        let gas_power_used = transactions.iter().map(|tx| tx.gas_limit).sum();

        let candidate = Event {
            epoch,
            seq,
            creator,
            lamport: max_parent_lamport + 1,
            creation_time: time,
            self_parent,
            other_parents,
            gas_power_used,
            transactions,
            ..Default::default()
        };
        let mut event = self
            .service
            .build_event(candidate)
            .map_err(|e| anyhow::anyhow!("build_event: {e}"))?;
        event.signature = key.sign(&event.signing_hash());
        let id = event.id();
        self.service
            .process_event(event)
            .map_err(|e| anyhow::anyhow!("process_event: {e}"))?;
        Ok(id)
    }
}

/// Wire storage, execution, finality, the ordering engine and the
/// ingestion service together over in-process adapters.
pub fn build_node(rules: Rules, genesis: &GenesisSpec, block_interval: usize) -> Node {
    let store = Arc::new(Store::new(Arc::new(InMemoryKv::new()), rules.flush));
    let ledger = Arc::new(TransferLedger::new(genesis.balances()));
    let feed = Arc::new(BroadcastFeed::new());

    bootstrap_genesis(
        &store,
        genesis.validator_set(),
        ledger.genesis_root(),
        genesis.time,
    );

    let finalizer = Arc::new(BlockFinalizer::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        Arc::clone(&feed),
        Arc::new(NoProtocolTxs),
        rules,
        true,
    ));
    let engine = Arc::new(LocalEngine::new(1, block_interval));
    engine.set_callbacks(finalizer);

    let service = Arc::new(IngestionService::new(
        rules,
        Arc::clone(&store),
        Arc::clone(&engine),
        Arc::new(NullEmitter),
    ));
    info!(
        validators = genesis.validators.len(),
        block_interval, "node wired"
    );
    Node {
        store,
        engine,
        service,
        ledger,
        feed,
    }
}
