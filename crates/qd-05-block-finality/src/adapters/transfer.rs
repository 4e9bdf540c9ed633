//! A balance-transfer execution layer.
//!
//! Stands in for the EVM behind the [`ExecutionEnv`] port: account
//! balances and nonces, intrinsic-gas accounting, deterministic state
//! roots. Used by tests and the single-node runtime; a real deployment
//! plugs the EVM in through the same port.

use crate::error::ExecError;
use crate::ports::{BlockContext, ExecOutcome, ExecutionEnv, ExecutionSession};
use parking_lot::RwLock;
use shared_types::{Address, Hash, Hasher, LogEntry, Receipt, SignedTransaction, U256};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Account {
    balance: U256,
    nonce: u64,
}

/// World state: deterministically ordered so roots are reproducible.
type World = BTreeMap<Address, Account>;

fn world_root(world: &World) -> Hash {
    let mut h = Hasher::new();
    h.u64(world.len() as u64);
    for (addr, account) in world {
        h.bytes(addr).u256(&account.balance).u64(account.nonce);
    }
    h.finalize()
}

/// The ledger holds a snapshot per known state root, so a session can
/// open at any previously committed root.
pub struct TransferLedger {
    snapshots: Arc<RwLock<BTreeMap<Hash, World>>>,
    genesis_root: Hash,
}

impl TransferLedger {
    pub fn new(genesis_balances: impl IntoIterator<Item = (Address, U256)>) -> Self {
        let world: World = genesis_balances
            .into_iter()
            .map(|(addr, balance)| (addr, Account { balance, nonce: 0 }))
            .collect();
        let genesis_root = world_root(&world);
        let mut snapshots = BTreeMap::new();
        snapshots.insert(genesis_root, world);
        Self {
            snapshots: Arc::new(RwLock::new(snapshots)),
            genesis_root,
        }
    }

    pub fn genesis_root(&self) -> Hash {
        self.genesis_root
    }

    pub fn balance_at(&self, root: &Hash, addr: &Address) -> Option<U256> {
        self.snapshots
            .read()
            .get(root)?
            .get(addr)
            .map(|a| a.balance)
    }
}

impl ExecutionEnv for TransferLedger {
    fn begin(&self, ctx: &BlockContext) -> Result<Box<dyn ExecutionSession>, ExecError> {
        let world = self
            .snapshots
            .read()
            .get(&ctx.prev_root)
            .cloned()
            .ok_or(ExecError::UnknownStateRoot)?;
        Ok(Box::new(TransferSession {
            world,
            snapshots: Arc::clone(&self.snapshots),
        }))
    }
}

struct TransferSession {
    world: World,
    snapshots: Arc<RwLock<BTreeMap<Hash, World>>>,
}

impl TransferSession {
    /// Why a transaction cannot execute, if it cannot.
    fn check(&self, tx: &SignedTransaction) -> Result<(), &'static str> {
        if tx.to.is_none() {
            return Err("contract creation unsupported");
        }
        let Some(sender) = self.world.get(&tx.from) else {
            return Err("unknown sender");
        };
        if sender.nonce != tx.nonce {
            return Err("nonce mismatch");
        }
        let fee = U256::from(tx.intrinsic_gas()) * tx.max_fee_per_gas;
        if sender.balance < tx.value + fee {
            return Err("insufficient balance");
        }
        Ok(())
    }

    fn apply(&mut self, tx: &SignedTransaction) -> Receipt {
        let gas_used = tx.intrinsic_gas();
        let fee = U256::from(gas_used) * tx.max_fee_per_gas;
        let to = tx.to.unwrap_or_default();

        let sender = self.world.entry(tx.from).or_default();
        sender.balance -= tx.value + fee;
        sender.nonce += 1;
        let receiver = self.world.entry(to).or_default();
        receiver.balance += tx.value;

        let mut value_bytes = [0u8; 32];
        tx.value.to_big_endian(&mut value_bytes);
        Receipt {
            tx_hash: tx.hash(),
            success: true,
            gas_used,
            logs: vec![LogEntry {
                address: to,
                topics: vec![tx.hash()],
                data: value_bytes.to_vec(),
            }],
        }
    }
}

impl ExecutionSession for TransferSession {
    fn execute(&mut self, txs: &[SignedTransaction], strict: bool) -> Result<ExecOutcome, ExecError> {
        let mut outcome = ExecOutcome::default();
        for (index, tx) in txs.iter().enumerate() {
            match self.check(tx) {
                Ok(()) => {
                    let receipt = self.apply(tx);
                    outcome.gas_used += receipt.gas_used;
                    outcome.fee += U256::from(receipt.gas_used) * tx.max_fee_per_gas;
                    outcome.receipts.push(receipt);
                }
                Err(reason) if strict => {
                    return Err(ExecError::InvalidTx { index, reason });
                }
                Err(_) => outcome.skipped.push(index as u32),
            }
        }
        Ok(outcome)
    }

    fn commit(&mut self) -> Result<Hash, ExecError> {
        let root = world_root(&self.world);
        self.snapshots.write().insert(root, self.world.clone());
        Ok(root)
    }
}
