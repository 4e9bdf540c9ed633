//! The atropos-never-applied edge case.
//!
//! The i'th atropos can be observed by the (i+1)'th, in which case the
//! engine never passes it through `apply_event`; `EndBlock` must fall back
//! to a direct store lookup.

use crate::harness::TestNet;

#[test]
fn test_end_block_with_zero_apply_event_calls() {
    let net = TestNet::new(3, 1_000);
    let mut blocks = net.node.feed.subscribe_blocks();

    let genesis_root = net.node.store.block_epoch_state().0.final_state_root;
    let id = net
        .emit(1, vec![net.transfer(1, [9u8; 20], 50, 21_000)], 1)
        .unwrap();

    // The engine decides with the event as atropos but withholds its
    // apply_event call, as if a later atropos had subsumed it.
    net.node.engine.withhold_apply_of(id);
    net.node.engine.decide_now();

    let block = blocks.try_recv().expect("a decided block");
    assert_eq!(block.height, 1);
    assert_eq!(block.atropos, id);
    // Nothing was applied, so nothing executed; but the block is well
    // formed and timed by the atropos fetched from the store.
    assert!(block.events.is_empty());
    assert!(block.transactions.is_empty());
    let atropos = net.node.store.event(&id).unwrap();
    assert_eq!(block.time, atropos.med_time);
    assert_eq!(block.state_root, genesis_root);

    let pair = net.node.store.block_epoch_state();
    assert_eq!(pair.0.last_block, 1);
}

#[test]
fn test_applied_atropos_needs_no_fallback() {
    let net = TestNet::new(3, 2);
    let mut blocks = net.node.feed.subscribe_blocks();

    net.emit(1, vec![net.transfer(1, [9u8; 20], 50, 21_000)], 1)
        .unwrap();
    let atropos_id = net
        .emit(2, vec![net.transfer(2, [9u8; 20], 60, 21_000)], 2)
        .unwrap();

    let block = blocks.try_recv().expect("a decided block");
    assert_eq!(block.atropos, atropos_id);
    assert_eq!(block.events.len(), 2);
    assert_eq!(block.transactions.len(), 2);
}
