//! # qd-05-block-finality
//!
//! Block finalization for Quasar-DAG: the `BeginBlock` / `ApplyEvent` /
//! `EndBlock` callbacks the ordering engine drives once it decides a block
//! boundary.
//!
//! ## Architecture
//!
//! Finalization is an explicit state machine (`Idle → Accumulating → Idle`)
//! with a `BlockCtx` threading BlockState, EpochState, the
//! atropos and the accumulated events between the callbacks; no mutable
//! state is shared through closures.
//!
//! `EndBlock` owns the deterministic ordering algorithm: confirmed events
//! are sorted by (Lamport, id) and the block keeps the maximal sorted
//! suffix whose cumulative gas power fits the hard limit; everything below
//! the cut spills into later blocks. Transactions execute through the
//! [`ports::ExecutionEnv`] black box, and any internal inconsistency found
//! here is a determinism break that terminates the node rather than a
//! recoverable error.

pub mod adapters;
pub mod error;
pub mod events_module;
pub mod finalizer;
pub mod ordering;
pub mod ports;
pub mod sealing;

pub use adapters::{BroadcastFeed, NoProtocolTxs, TransferLedger};
pub use error::ExecError;
pub use finalizer::BlockFinalizer;
pub use ports::{
    BlockContext, ChainFeed, ExecOutcome, ExecutionEnv, ExecutionSession, ProtocolTxSource,
};
