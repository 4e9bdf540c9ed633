//! LLR vote/record round-trips between two nodes sharing a genesis.

use crate::harness::TestNet;
use qd_04_event_ingestion::OrderingEngine;
use shared_types::{
    BlockVotes, EpochVote, FullBlockRecord, FullEpochRecord, Rules, SignedBlockVotes,
    SignedEpochVote, ValidatorId,
};

fn block_votes(creator: u32, start: u64, votes: Vec<[u8; 32]>) -> SignedBlockVotes {
    SignedBlockVotes {
        creator: ValidatorId(creator),
        votes: BlockVotes {
            epoch: 1,
            start,
            votes,
        },
        signature: [0u8; 64],
    }
}

/// A block produced on one node, exported as a full record, imported on a
/// fresh node once votes decide it, must land byte-identical.
#[test]
fn test_block_record_roundtrip() {
    let producer = TestNet::new(3, 2);
    let mut blocks = producer.node.feed.subscribe_blocks();
    let mut txs_feed = producer.node.feed.subscribe_txs();

    producer
        .emit(1, vec![producer.transfer(1, [9u8; 20], 100, 21_000)], 1)
        .unwrap();
    producer
        .emit(2, vec![producer.transfer(2, [9u8; 20], 200, 21_000)], 2)
        .unwrap();

    let block = blocks.try_recv().expect("a decided block");
    let txs = txs_feed.try_recv().expect("executed txs");
    let record = FullBlockRecord {
        block: (*block).clone(),
        txs: (*txs).clone(),
    };

    // The producer itself decided the same record hash.
    assert_eq!(
        producer.node.store.block_result(1),
        Some(record.hash()),
        "producer's own result must match the exported record"
    );

    // A fresh node decides via votes, then imports the record.
    let importer = TestNet::new(3, 2);
    let hash = record.hash();
    importer
        .node
        .service
        .process_block_votes(&block_votes(1, 1, vec![hash]))
        .unwrap();
    assert!(importer.node.store.block_result(1).is_none());
    importer
        .node
        .service
        .process_block_votes(&block_votes(2, 1, vec![hash]))
        .unwrap();
    assert_eq!(importer.node.store.block_result(1), Some(hash));

    importer
        .node
        .service
        .process_full_block_record(&record)
        .unwrap();
    let imported = importer.node.store.block(1).expect("imported block");
    assert_eq!(imported.hash(), block.hash());
    assert_eq!(importer.node.store.llr_state().lowest_block_to_fill, 2);
}

/// An epoch sealed on one node, exported as a full epoch record, imported
/// on a fresh node, must yield identical BlockState/EpochState hashes.
#[test]
fn test_epoch_record_roundtrip() {
    let mut rules = Rules::default();
    rules.blocks.max_epoch_blocks = 1;

    let producer = TestNet::with_rules(3, 1, rules);
    producer
        .emit(1, vec![producer.transfer(1, [9u8; 20], 100, 21_000)], 1)
        .unwrap();

    let pair = producer.node.store.block_epoch_state();
    assert_eq!(pair.1.epoch, 2, "the single-block epoch must have sealed");
    let record = FullEpochRecord {
        block_state: pair.0.clone(),
        epoch_state: pair.1.clone(),
    };
    assert_eq!(
        producer.node.store.epoch_result(2),
        Some(record.hash()),
        "producer's own epoch result must match the exported record"
    );

    let importer = TestNet::with_rules(3, 1, rules);
    let vote = |creator: u32| SignedEpochVote {
        creator: ValidatorId(creator),
        vote: EpochVote {
            epoch: 2,
            vote: record.hash(),
        },
        signature: [0u8; 64],
    };
    importer.node.service.process_epoch_vote(&vote(1)).unwrap();
    importer.node.service.process_epoch_vote(&vote(2)).unwrap();
    importer
        .node
        .service
        .process_full_epoch_record(&record)
        .unwrap();

    let imported = importer.node.store.block_epoch_state();
    assert_eq!(imported.0.hash(), pair.0.hash());
    assert_eq!(imported.1.hash(), pair.1.hash());
    // The importer's engine followed the fast-forward.
    assert_eq!(importer.node.engine.current_epoch(), 2);
}
