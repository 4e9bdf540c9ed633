//! # qd-03-chain-storage
//!
//! Persistence for Quasar-DAG: events, blocks, decided consensus state and
//! the LLR vote/record indices.
//!
//! ## Architecture
//!
//! The underlying engine is a plain key-value abstraction ([`KvStore`]):
//! get/put/delete/iterate. Everything chain-specific lives in the typed
//! [`Store`] on top of it, which also owns:
//!
//! - LRU caches in front of the event and block tables
//! - the atomic "current state" snapshot (one `BlockState` + `EpochState`
//!   pair, swapped wholesale so readers never observe a torn combination)
//! - the guarded read-modify-write for [`shared_types::LlrState`]
//! - commit thresholds (time- and size-based, never per-event)
//!
//! Corruption of our own tables is a determinism break: reads that fail to
//! decode terminate the node rather than propagate.

pub mod error;
pub mod kv;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use kv::{InMemoryKv, KvStore};
#[cfg(feature = "rocksdb")]
pub use kv::rocks::RocksKv;
pub use store::{Store, TxPosition};
