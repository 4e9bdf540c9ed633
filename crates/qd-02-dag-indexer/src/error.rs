//! Error types for the DAG indexer.

use shared_types::{Epoch, EventId, FaultClass, ValidatorId};
use thiserror::Error;

/// DAG indexer errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexerError {
    /// A parent has not been indexed yet; the event arrived out of order.
    #[error("parent {parent:?} is not indexed")]
    ParentNotIndexed { parent: EventId },

    /// The creator is not in the indexer's validator set.
    #[error("unknown creator {creator} for epoch {epoch}")]
    UnknownCreator { creator: ValidatorId, epoch: Epoch },

    /// The event was already indexed.
    #[error("event {id:?} is already indexed")]
    AlreadyIndexed { id: EventId },

    /// The requested event is not in the index.
    #[error("event {id:?} is not indexed")]
    NotIndexed { id: EventId },
}

impl IndexerError {
    pub fn fault_class(&self) -> FaultClass {
        match self {
            IndexerError::ParentNotIndexed { .. } => FaultClass::Stale,
            IndexerError::UnknownCreator { .. } => FaultClass::Malicious,
            IndexerError::AlreadyIndexed { .. } => FaultClass::Duplicate,
            IndexerError::NotIndexed { .. } => FaultClass::Stale,
        }
    }
}

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;
