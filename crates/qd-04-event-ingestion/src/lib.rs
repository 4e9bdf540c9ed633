//! # qd-04-event-ingestion
//!
//! The ingestion service for Quasar-DAG: the single place every
//! state-mutating input converges.
//!
//! ## Architecture
//!
//! ```text
//!   peers ──→ process_event ─┐
//!   emitter ─→ build_event  ─┤
//!   LLR votes ──────────────-┼──→ Mutex<EngineInner> ──→ engine / finalizer
//!   LLR records (apply step) ┘          (engineMu)
//! ```
//!
//! aBFT ordering requires a strict sequential history, so the mutating
//! core is one mutex-guarded context (`EngineInner`) rather than ad-hoc
//! per-field locking. Network I/O never runs under the lock; signature
//! batching and decode happen at the edges.
//!
//! Epoch-scoped contexts (validator set, public keys, gas power anchors)
//! are not re-keyed by hand on epoch advance: the validation ports read
//! the store's atomic state snapshot, so the swap at the seal re-keys
//! every checker at once. The DAG index is the one epoch-scoped structure
//! reset explicitly.

pub mod adapters;
pub mod context;
pub mod error;
pub mod genesis;
pub mod ports;
pub mod service;

pub use adapters::LocalEngine;
pub use context::{StoreDecided, StoreEpochs, StoreEvents};
pub use error::{IngestError, IngestResult};
pub use genesis::bootstrap_genesis;
pub use ports::{EmitterNotify, NullEmitter, OrderingEngine};
pub use service::IngestionService;
