//! DAG events, transactions and finalized blocks.
//!
//! An [`Event`] is a validator-signed DAG vertex: causal parent references,
//! consensus metadata (epoch / seq / frame / Lamport), a gas power statement
//! and a payload of transactions, misbehaviour proofs and LLR votes. A
//! [`Block`] is the finalized unit produced once the ordering engine decides
//! a block boundary.

use crate::hashing::Hasher;
use crate::ids::{
    Address, BlockHeight, Epoch, EventId, EventSeq, Frame, Hash, Lamport, Signature, Timestamp,
    ValidatorId,
};
use crate::mp::{EventLocator, MisbehaviourProof};
use crate::votes::{SignedBlockVotes, SignedEpochVote};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Index of the long-term gas power allocation window.
pub const LONG_TERM_WINDOW: usize = 0;
/// Index of the short-term gas power allocation window.
pub const SHORT_TERM_WINDOW: usize = 1;

/// Remaining gas power per allocation window after this event.
///
/// Window 0 accumulates slowly over a long period, window 1 refills fast but
/// caps low; an event must fit within both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GasPowerLeft(pub [u64; 2]);

impl GasPowerLeft {
    pub fn min(&self) -> u64 {
        self.0[0].min(self.0[1])
    }
}

/// A validator-signed DAG vertex.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Format version of the event encoding.
    pub version: u8,
    pub epoch: Epoch,
    /// Per-(creator, epoch) monotonic sequence number, starting at 1.
    pub seq: EventSeq,
    /// Consensus round marker, assigned by the ordering engine.
    pub frame: Frame,
    pub creator: ValidatorId,
    /// Logical clock: strictly `max(parents' lamport) + 1`.
    pub lamport: Lamport,
    /// Claimed wall-clock creation time.
    pub creation_time: Timestamp,
    /// Claimed median time over observed validators, re-derived and checked
    /// exactly on ingestion.
    pub med_time: Timestamp,
    /// Previous event by the same creator. `None` iff `seq == 1`.
    pub self_parent: Option<EventId>,
    /// Causal dependencies on other validators' events.
    pub other_parents: Vec<EventId>,
    /// Gas power consumed by this event's payload.
    pub gas_power_used: u64,
    /// Declared remaining gas power per allocation window.
    pub gas_power_left: GasPowerLeft,
    /// Opaque extra bytes, bounded by the DAG rules.
    pub extra: Vec<u8>,

    // Payload. Votes are carried as independently signed wrappers so they
    // can be relayed and used as misbehaviour-proof halves without the
    // enclosing event.
    pub transactions: Vec<SignedTransaction>,
    pub misbehaviour_proofs: Vec<MisbehaviourProof>,
    pub block_votes: Option<SignedBlockVotes>,
    pub epoch_vote: Option<SignedEpochVote>,

    /// Commitment to the payload fields above; part of the signed locator.
    pub payload_hash: Hash,
    /// Ed25519 signature over `locator().hash()`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            version: 1,
            epoch: 0,
            seq: 0,
            frame: 0,
            creator: ValidatorId(0),
            lamport: 0,
            creation_time: 0,
            med_time: 0,
            self_parent: None,
            other_parents: Vec::new(),
            gas_power_used: 0,
            gas_power_left: GasPowerLeft::default(),
            extra: Vec::new(),
            transactions: Vec::new(),
            misbehaviour_proofs: Vec::new(),
            block_votes: None,
            epoch_vote: None,
            payload_hash: [0u8; 32],
            signature: [0u8; 64],
        }
    }
}

impl Event {
    /// All parents, self-parent first.
    pub fn parents(&self) -> impl Iterator<Item = &EventId> {
        self.self_parent.iter().chain(self.other_parents.iter())
    }

    pub fn parent_count(&self) -> usize {
        self.other_parents.len() + usize::from(self.self_parent.is_some())
    }

    /// Hash of the non-payload fields not already covered by the locator.
    pub fn base_hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u8(self.version)
            .u32(self.frame)
            .u64(self.creation_time)
            .u64(self.med_time);
        match &self.self_parent {
            Some(p) => h.u8(1).bytes(p.as_bytes()),
            None => h.u8(0),
        };
        h.u64(self.other_parents.len() as u64);
        for p in &self.other_parents {
            h.bytes(p.as_bytes());
        }
        h.u64(self.gas_power_used)
            .u64(self.gas_power_left.0[0])
            .u64(self.gas_power_left.0[1])
            .var_bytes(&self.extra);
        h.finalize()
    }

    /// Compact signed statement: enough to prove authorship and detect
    /// double-signing without shipping the full event.
    pub fn locator(&self) -> EventLocator {
        EventLocator {
            base_hash: self.base_hash(),
            creator: self.creator,
            epoch: self.epoch,
            seq: self.seq,
            lamport: self.lamport,
            payload_hash: self.payload_hash,
        }
    }

    /// The digest the creator signs.
    pub fn signing_hash(&self) -> Hash {
        self.locator().hash()
    }

    /// Content-derived event ID.
    pub fn id(&self) -> EventId {
        EventId(self.locator().hash())
    }

    /// Recompute the payload commitment from the payload fields.
    pub fn compute_payload_hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u64(self.transactions.len() as u64);
        for tx in &self.transactions {
            h.bytes(&tx.hash());
        }
        h.u64(self.misbehaviour_proofs.len() as u64);
        for mp in &self.misbehaviour_proofs {
            h.bytes(&mp.hash());
        }
        match &self.block_votes {
            Some(bvs) => h.u8(1).bytes(&bvs.hash()),
            None => h.u8(0),
        };
        match &self.epoch_vote {
            Some(ev) => h.u8(1).bytes(&ev.hash()),
            None => h.u8(0),
        };
        h.finalize()
    }

    pub fn has_payload(&self) -> bool {
        !self.transactions.is_empty()
            || !self.misbehaviour_proofs.is_empty()
            || self.block_votes.is_some()
            || self.epoch_vote.is_some()
    }
}

/// An EVM-style signed transaction carried inside events.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Sender address.
    pub from: Address,
    /// Recipient address; `None` creates a contract.
    pub to: Option<Address>,
    /// Sender's nonce to prevent replay.
    pub nonce: u64,
    /// Transferred value in base units.
    pub value: U256,
    /// Gas limit for this transaction.
    pub gas_limit: u64,
    /// Maximum total fee per gas the sender will pay.
    pub max_fee_per_gas: U256,
    /// Maximum priority fee (tip) per gas.
    pub max_priority_fee_per_gas: U256,
    /// Call data / init code.
    pub data: Vec<u8>,
    /// Sender's signature over the transaction hash.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// Base gas charged for any transaction.
pub const TX_GAS: u64 = 21_000;
/// Extra gas charged for contract creation.
pub const TX_GAS_CONTRACT_CREATION: u64 = 32_000;
/// Gas per zero byte of call data.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Gas per non-zero byte of call data.
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

impl SignedTransaction {
    /// Compute the transaction hash.
    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.bytes(&self.from);
        match &self.to {
            Some(to) => h.u8(1).bytes(to),
            None => h.u8(0),
        };
        h.u64(self.nonce)
            .u256(&self.value)
            .u64(self.gas_limit)
            .u256(&self.max_fee_per_gas)
            .u256(&self.max_priority_fee_per_gas)
            .var_bytes(&self.data);
        h.finalize()
    }

    /// Gas consumed before any execution happens.
    pub fn intrinsic_gas(&self) -> u64 {
        let mut gas = TX_GAS;
        if self.to.is_none() {
            gas += TX_GAS_CONTRACT_CREATION;
        }
        for b in &self.data {
            gas += if *b == 0 {
                TX_DATA_ZERO_GAS
            } else {
                TX_DATA_NON_ZERO_GAS
            };
        }
        gas
    }
}

/// A log record emitted during transaction execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Vec<u8>,
}

/// Execution result for one transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: Hash,
    pub success: bool,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
}

/// A finalized block: the deterministic projection of one decided batch of
/// events onto the EVM.
///
/// Created exactly once inside `EndBlock` and immutable thereafter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    pub height: BlockHeight,
    /// The deciding event chosen by consensus.
    pub atropos: EventId,
    /// Confirmed events included in this block, in final execution order.
    /// Events spilled by the gas hard limit are absent; consensus has still
    /// confirmed them and they surface in a later block's accounting.
    pub events: Vec<EventId>,
    /// Ordered hashes of the executed transactions, skips removed.
    pub transactions: Vec<Hash>,
    /// Hashes of protocol-internal transactions executed around sealing.
    pub internal_tx_hashes: Vec<Hash>,
    /// World state root after execution.
    pub state_root: Hash,
    pub gas_used: u64,
    /// Indices (into the pre-skip concatenated order) the EVM skipped.
    pub skipped_txs: Vec<u32>,
    /// Block time: the atropos' median time.
    pub time: Timestamp,
}

impl Block {
    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u64(self.height).bytes(self.atropos.as_bytes());
        h.u64(self.events.len() as u64);
        for e in &self.events {
            h.bytes(e.as_bytes());
        }
        h.u64(self.transactions.len() as u64);
        for tx in &self.transactions {
            h.bytes(tx);
        }
        h.u64(self.internal_tx_hashes.len() as u64);
        for tx in &self.internal_tx_hashes {
            h.bytes(tx);
        }
        h.bytes(&self.state_root).u64(self.gas_used);
        h.u64(self.skipped_txs.len() as u64);
        for i in &self.skipped_txs {
            h.u32(*i);
        }
        h.u64(self.time);
        h.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(nonce: u64) -> SignedTransaction {
        SignedTransaction {
            from: [1u8; 20],
            to: Some([2u8; 20]),
            nonce,
            value: U256::from(10),
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(2),
            max_priority_fee_per_gas: U256::from(1),
            data: Vec::new(),
            signature: [0u8; 64],
        }
    }

    #[test]
    fn test_event_id_commits_to_payload() {
        let mut e = Event::default();
        e.payload_hash = e.compute_payload_hash();
        let id1 = e.id();

        e.transactions.push(transfer(0));
        e.payload_hash = e.compute_payload_hash();
        assert_ne!(id1, e.id());
    }

    #[test]
    fn test_event_id_commits_to_parents() {
        let mut e = Event::default();
        let id1 = e.id();
        e.other_parents.push(EventId([9u8; 32]));
        assert_ne!(id1, e.id());
    }

    #[test]
    fn test_intrinsic_gas() {
        let mut tx = transfer(0);
        assert_eq!(tx.intrinsic_gas(), TX_GAS);

        tx.data = vec![0, 0, 1];
        assert_eq!(
            tx.intrinsic_gas(),
            TX_GAS + 2 * TX_DATA_ZERO_GAS + TX_DATA_NON_ZERO_GAS
        );

        tx.to = None;
        assert_eq!(
            tx.intrinsic_gas(),
            TX_GAS + TX_GAS_CONTRACT_CREATION + 2 * TX_DATA_ZERO_GAS + TX_DATA_NON_ZERO_GAS
        );
    }

    #[test]
    fn test_block_hash_changes_with_events() {
        let mut b = Block::default();
        let h1 = b.hash();
        b.events.push(EventId([1u8; 32]));
        assert_ne!(h1, b.hash());
    }
}
