//! A single-process network harness.

use node_runtime::{build_node, GenesisSpec, Node};
use shared_crypto::Keypair;
use shared_types::{
    Epoch, Event, EventId, EventLocator, EventSeq, Lamport, Rules, SignedEventLocator,
    SignedTransaction, Timestamp, ValidatorId, NANOS_PER_SEC, U256,
};

/// A wired node plus the validator keys of its demo genesis.
pub struct TestNet {
    pub node: Node,
    pub keys: Vec<Keypair>,
    pub genesis_time: Timestamp,
}

impl TestNet {
    pub fn new(validators: u32, block_interval: usize) -> Self {
        Self::with_rules(validators, block_interval, Rules::default())
    }

    pub fn with_rules(validators: u32, block_interval: usize, rules: Rules) -> Self {
        let (spec, keys) = GenesisSpec::demo(validators);
        let genesis_time = spec.time;
        let node = build_node(rules, &spec, block_interval);
        Self {
            node,
            keys,
            genesis_time,
        }
    }

    pub fn key(&self, creator: u32) -> &Keypair {
        &self.keys[creator as usize - 1]
    }

    /// A transfer from the creator's funded demo account.
    pub fn transfer(&self, from: u32, to: [u8; 20], value: u64, gas_limit: u64) -> SignedTransaction {
        SignedTransaction {
            from: [from as u8; 20],
            to: Some(to),
            nonce: 0,
            value: U256::from(value),
            gas_limit,
            max_fee_per_gas: U256::one(),
            max_priority_fee_per_gas: U256::zero(),
            data: Vec::new(),
            signature: [0u8; 64],
        }
    }

    /// Emit an event with the given payload `secs` after genesis.
    pub fn emit(
        &self,
        creator: u32,
        txs: Vec<SignedTransaction>,
        secs: u64,
    ) -> anyhow::Result<EventId> {
        self.node.emit(
            self.key(creator),
            ValidatorId(creator),
            txs,
            self.genesis_time + secs * NANOS_PER_SEC,
        )
    }

    /// Emit with a payload customizer (misbehaviour proofs, votes).
    pub fn emit_with(
        &self,
        creator: u32,
        secs: u64,
        customize: impl FnOnce(&mut Event),
    ) -> anyhow::Result<EventId> {
        let creator_id = ValidatorId(creator);
        let self_parent = self.node.service.last_event_of(creator_id);
        let other_parents: Vec<_> = self
            .node
            .service
            .heads()
            .into_iter()
            .filter(|h| Some(*h) != self_parent)
            .collect();
        let seq = match &self_parent {
            Some(id) => self.node.store.event(id).unwrap().seq + 1,
            None => 1,
        };
        let lamport = self_parent
            .iter()
            .chain(other_parents.iter())
            .filter_map(|id| self.node.store.event(id))
            .map(|e| e.lamport)
            .max()
            .unwrap_or(0)
            + 1;

        let mut candidate = Event {
            epoch: self.node.store.block_epoch_state().1.epoch,
            seq,
            creator: creator_id,
            lamport,
            creation_time: self.genesis_time + secs * NANOS_PER_SEC,
            self_parent,
            other_parents,
            ..Default::default()
        };
        customize(&mut candidate);

        let mut event = self
            .node
            .service
            .build_event(candidate)
            .map_err(|e| anyhow::anyhow!("build_event: {e}"))?;
        event.signature = self.key(creator).sign(&event.signing_hash());
        let id = event.id();
        self.node
            .service
            .process_event(event)
            .map_err(|e| anyhow::anyhow!("process_event: {e}"))?;
        Ok(id)
    }

    /// A properly signed event locator, as a misbehaviour-proof half.
    pub fn signed_locator(
        &self,
        creator: u32,
        epoch: Epoch,
        seq: EventSeq,
        lamport: Lamport,
    ) -> SignedEventLocator {
        let event = Event {
            epoch,
            seq,
            creator: ValidatorId(creator),
            lamport,
            creation_time: self.genesis_time,
            med_time: self.genesis_time,
            ..Default::default()
        };
        let locator: EventLocator = event.locator();
        SignedEventLocator {
            locator,
            signature: self.key(creator).sign(&locator.hash()),
        }
    }
}
