//! The full ingestion → ordering → execution pipeline.

use crate::harness::TestNet;
use qd_04_event_ingestion::IngestError;
use shared_types::{ValidatorId, U256};

const RECIPIENT: [u8; 20] = [42u8; 20];

/// Ten equal-stake validators, one transfer event each, one consensus
/// block: transaction order must equal ascending Lamport order of the
/// originating events, and the recipient collects every transfer.
#[test]
fn test_ten_validator_transfer_block() {
    let net = TestNet::new(10, 10);
    let mut blocks = net.node.feed.subscribe_blocks();

    let mut expected_tx_hashes = Vec::new();
    for i in 1..=10u32 {
        let tx = net.transfer(i, RECIPIENT, 1_000, 21_000);
        expected_tx_hashes.push(tx.hash());
        net.emit(i, vec![tx], i as u64).unwrap();
    }

    let block = blocks.try_recv().expect("a decided block");
    assert_eq!(block.height, 1);
    assert_eq!(block.events.len(), 10);
    assert!(block.skipped_txs.is_empty());

    // Events were emitted as a chain, so Lamport order is emission order
    // and the block's transaction order must match it.
    assert_eq!(block.transactions, expected_tx_hashes);

    // Ascending Lamport order across the included events.
    let lamports: Vec<u64> = block
        .events
        .iter()
        .map(|id| net.node.store.event(id).unwrap().lamport)
        .collect();
    let mut sorted = lamports.clone();
    sorted.sort_unstable();
    assert_eq!(lamports, sorted);

    // The recipient collected all ten transfers.
    assert_eq!(
        net.node.ledger.balance_at(&block.state_root, &RECIPIENT),
        Some(U256::from(10_000))
    );

    let pair = net.node.store.block_epoch_state();
    assert_eq!(pair.0.last_block, 1);
    assert_eq!(pair.0.final_state_root, block.state_root);
}

/// Re-delivering a connected event is a distinct no-op, and no block or
/// epoch state is double-counted.
#[test]
fn test_redelivery_is_idempotent() {
    let net = TestNet::new(3, 2);
    let id = net.emit(1, vec![net.transfer(1, RECIPIENT, 5, 21_000)], 1).unwrap();

    let state_before = net.node.store.block_epoch_state();
    let event = net.node.store.event(&id).unwrap();
    let err = net
        .node
        .service
        .process_event((*event).clone())
        .unwrap_err();
    assert_eq!(err, IngestError::AlreadyConnected { id });

    let state_after = net.node.store.block_epoch_state();
    assert_eq!(state_before.0.hash(), state_after.0.hash());
    assert_eq!(state_before.1.hash(), state_after.1.hash());
}

/// Unused transaction gas returns to the originating validator as a gas
/// power refund; used gas accrues origination score.
#[test]
fn test_receipt_accounting() {
    let net = TestNet::new(3, 1);
    // 30k declared, 21k intrinsic used by a plain transfer.
    net.emit(2, vec![net.transfer(2, RECIPIENT, 5, 30_000)], 1)
        .unwrap();

    let pair = net.node.store.block_epoch_state();
    let idx = pair.1.validators.index_of(ValidatorId(2)).unwrap();
    let vs = &pair.0.validators[idx];
    assert_eq!(vs.origination_score, 21_000);
    assert_eq!(vs.gas_refund, 9_000);
    assert_eq!(vs.last_event, net.node.service.last_event_of(ValidatorId(2)));
}
