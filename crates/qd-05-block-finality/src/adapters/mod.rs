//! In-process adapters for the finality ports.

pub mod feed;
pub mod protocol;
pub mod transfer;

pub use feed::BroadcastFeed;
pub use protocol::NoProtocolTxs;
pub use transfer::TransferLedger;
