//! Chain feed over tokio broadcast channels.

use crate::ports::ChainFeed;
use shared_types::{Block, LogEntry, SignedTransaction};
use std::sync::Arc;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 256;

/// Fan-out of finalized-chain notifications to any number of subscribers
/// (P2P broadcast, RPC subscriptions). Sending never blocks; slow
/// subscribers observe lag on their own receiver.
pub struct BroadcastFeed {
    blocks: broadcast::Sender<Arc<Block>>,
    txs: broadcast::Sender<Arc<Vec<SignedTransaction>>>,
    logs: broadcast::Sender<Arc<Vec<LogEntry>>>,
}

impl BroadcastFeed {
    pub fn new() -> Self {
        Self {
            blocks: broadcast::channel(FEED_CAPACITY).0,
            txs: broadcast::channel(FEED_CAPACITY).0,
            logs: broadcast::channel(FEED_CAPACITY).0,
        }
    }

    pub fn subscribe_blocks(&self) -> broadcast::Receiver<Arc<Block>> {
        self.blocks.subscribe()
    }

    pub fn subscribe_txs(&self) -> broadcast::Receiver<Arc<Vec<SignedTransaction>>> {
        self.txs.subscribe()
    }

    pub fn subscribe_logs(&self) -> broadcast::Receiver<Arc<Vec<LogEntry>>> {
        self.logs.subscribe()
    }
}

impl Default for BroadcastFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainFeed for BroadcastFeed {
    fn new_block(&self, block: &Block) {
        // A send error only means no subscribers are listening.
        let _ = self.blocks.send(Arc::new(block.clone()));
    }

    fn new_txs(&self, txs: &[SignedTransaction]) {
        let _ = self.txs.send(Arc::new(txs.to_vec()));
    }

    fn new_logs(&self, logs: &[LogEntry]) {
        let _ = self.logs.send(Arc::new(logs.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_blocks() {
        let feed = BroadcastFeed::new();
        let mut rx = feed.subscribe_blocks();
        feed.new_block(&Block {
            height: 3,
            ..Default::default()
        });
        assert_eq!(rx.try_recv().unwrap().height, 3);
    }

    #[test]
    fn test_send_without_subscribers_is_fine() {
        let feed = BroadcastFeed::new();
        feed.new_block(&Block::default());
        feed.new_txs(&[]);
        feed.new_logs(&[]);
    }
}
