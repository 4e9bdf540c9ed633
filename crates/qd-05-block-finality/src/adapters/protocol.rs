//! Protocol-transaction source that emits nothing.
//!
//! Networks without protocol-level bootstrapping or on-chain reward
//! distribution run with this adapter; the seal decision point and
//! execution ordering stay exercised either way.

use crate::ports::ProtocolTxSource;
use shared_types::{BlockState, EpochState, SignedTransaction};

pub struct NoProtocolTxs;

impl ProtocolTxSource for NoProtocolTxs {
    fn pre_seal_txs(&self, _bs: &BlockState, _es: &EpochState) -> Vec<SignedTransaction> {
        Vec::new()
    }

    fn post_seal_txs(
        &self,
        _bs: &BlockState,
        _es: &EpochState,
        _sealed: bool,
    ) -> Vec<SignedTransaction> {
        Vec::new()
    }
}
