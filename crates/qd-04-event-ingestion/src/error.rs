//! Error types for the ingestion service.

use qd_01_event_validation::ValidationError;
use qd_02_dag_indexer::IndexerError;
use shared_types::{EventId, FaultClass};
use thiserror::Error;

/// Ingestion pipeline errors. The stable sentinel set peers dispatch on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    /// The service is stopping; nothing is accepted any more.
    #[error("service is stopped")]
    Stopped,

    /// Idempotent re-delivery: the event is already connected.
    #[error("event {id:?} is already connected")]
    AlreadyConnected { id: EventId },

    /// The validation chain rejected the event.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The DAG indexer rejected the event.
    #[error(transparent)]
    Indexer(#[from] IndexerError),

    /// Claimed median time does not equal the locally derived one. A
    /// deterministic computation, so a mismatch is a protocol violation.
    #[error("median time mismatch: claimed {claimed}, computed {computed}")]
    WrongMedianTime { claimed: u64, computed: u64 },

    /// A self-emitted event does not fit the creator's gas power; it is
    /// dropped, not an error of the network.
    #[error("not enough gas power to emit")]
    NotEnoughGasPower,

    /// The consensus engine rejected the event; all speculative state was
    /// rolled back.
    #[error("consensus engine rejected event: {reason}")]
    Consensus { reason: String },
}

impl IngestError {
    /// Exhaustive mapping into the caller-facing fault classes.
    pub fn fault_class(&self) -> FaultClass {
        match self {
            IngestError::Stopped => FaultClass::Stale,
            IngestError::AlreadyConnected { .. } => FaultClass::Duplicate,
            IngestError::Validation(e) => e.fault_class(),
            IngestError::Indexer(e) => e.fault_class(),
            IngestError::WrongMedianTime { .. } => FaultClass::Malicious,
            IngestError::NotEnoughGasPower => FaultClass::Stale,
            IngestError::Consensus { .. } => FaultClass::Stale,
        }
    }
}

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;
