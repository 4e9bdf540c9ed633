//! # qd-02-dag-indexer
//!
//! DAG indexer for Quasar-DAG.
//!
//! Maintains, for every indexed event, the highest event it observes from
//! each validator (a per-event vector clock over the validator set), and
//! derives the stake-weighted median creation time used for timestamp
//! checks and block times.
//!
//! ## Speculative indexing
//!
//! `add` stages an event without committing it. The ingestion pipeline
//! either `flush`es the stage once the consensus engine accepted the event,
//! or rolls it back with `drop_not_flushed` on any early return. The
//! committed index never contains an event the store does not.

pub mod error;
pub mod indexer;

pub use error::{IndexerError, IndexerResult};
pub use indexer::{DagIndexer, ObservedEvent};
