//! Ports to the external collaborators of finalization: the execution
//! layer, protocol-internal transaction sources, and the chain feed.

use crate::error::ExecError;
use shared_types::{
    Block, BlockHeight, BlockState, EpochState, EventId, Hash, LogEntry, Receipt,
    SignedTransaction, Timestamp, U256,
};

/// The environment a block executes in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub height: BlockHeight,
    pub time: Timestamp,
    pub atropos: EventId,
    /// State root of the previous block.
    pub prev_root: Hash,
}

/// Result of executing a batch of transactions.
#[derive(Clone, Debug, Default)]
pub struct ExecOutcome {
    /// One receipt per executed (non-skipped) transaction, in order.
    pub receipts: Vec<Receipt>,
    /// Indices into the input batch that were skipped.
    pub skipped: Vec<u32>,
    pub gas_used: u64,
    pub fee: U256,
}

/// One block's execution session, opened at the previous block's root.
pub trait ExecutionSession: Send {
    /// Execute a batch. In strict mode an invalid transaction is an error;
    /// otherwise it is skipped.
    fn execute(&mut self, txs: &[SignedTransaction], strict: bool) -> Result<ExecOutcome, ExecError>;

    /// Commit the accumulated state changes, returning the new state root.
    fn commit(&mut self) -> Result<Hash, ExecError>;
}

/// The EVM-compatible execution layer, consumed as a black box.
pub trait ExecutionEnv: Send + Sync {
    fn begin(&self, ctx: &BlockContext) -> Result<Box<dyn ExecutionSession>, ExecError>;
}

/// Protocol-level transactions executed around the epoch-seal decision.
pub trait ProtocolTxSource: Send + Sync {
    /// Transactions that must run before anything else in the block
    /// (validator-set bootstrapping and similar).
    fn pre_seal_txs(&self, block_state: &BlockState, epoch_state: &EpochState)
        -> Vec<SignedTransaction>;

    /// Transactions that run after the epoch-seal decision point
    /// (reward distribution and similar).
    fn post_seal_txs(
        &self,
        block_state: &BlockState,
        epoch_state: &EpochState,
        sealed: bool,
    ) -> Vec<SignedTransaction>;
}

/// Downstream notifications once a block is final.
pub trait ChainFeed: Send + Sync {
    fn new_block(&self, block: &Block);
    fn new_txs(&self, txs: &[SignedTransaction]);
    fn new_logs(&self, logs: &[LogEntry]);
}
