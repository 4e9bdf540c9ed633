//! Error types for the LLR track.

use shared_types::{BlockHeight, Epoch, FaultClass, ValidatorId};
use thiserror::Error;

/// LLR vote and record processing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LlrError {
    /// These block votes were already tallied.
    #[error("block votes by {creator} from height {start} already processed")]
    AlreadyProcessedBVs {
        creator: ValidatorId,
        start: BlockHeight,
    },

    /// Votes reference an epoch whose validator set is unknown here.
    #[error("unknown epoch {epoch} for block votes")]
    UnknownEpochBVs { epoch: Epoch },

    /// This epoch vote was already tallied.
    #[error("epoch vote by {creator} for epoch {epoch} already processed")]
    AlreadyProcessedEV { creator: ValidatorId, epoch: Epoch },

    /// The vote references an epoch whose validator set is unknown here.
    #[error("unknown epoch {epoch} for epoch vote")]
    UnknownEpochEV { epoch: Epoch },

    /// The voter is not a validator of the referenced epoch.
    #[error("{creator} is not a validator of epoch {epoch}")]
    UnknownVoter { creator: ValidatorId, epoch: Epoch },

    /// No decided vote yet for this block record.
    #[error("block record {height} is undecided")]
    UndecidedBR { height: BlockHeight },

    /// The block record was already imported.
    #[error("block record {height} already processed")]
    AlreadyProcessedBR { height: BlockHeight },

    /// The record's hash does not match the decided vote.
    #[error("block record {height} does not match the decided hash")]
    MismatchedBR { height: BlockHeight },

    /// No decided vote yet for this epoch record.
    #[error("epoch record {epoch} is undecided")]
    UndecidedER { epoch: Epoch },

    /// The epoch record was already imported.
    #[error("epoch record {epoch} already processed")]
    AlreadyProcessedER { epoch: Epoch },

    /// The record's hash does not match the decided vote.
    #[error("epoch record {epoch} does not match the decided hash")]
    MismatchedER { epoch: Epoch },
}

impl LlrError {
    /// Exhaustive mapping into the caller-facing fault classes.
    pub fn fault_class(&self) -> FaultClass {
        use LlrError::*;
        match self {
            AlreadyProcessedBVs { .. } | AlreadyProcessedEV { .. } | AlreadyProcessedBR { .. }
            | AlreadyProcessedER { .. } => FaultClass::Duplicate,
            UnknownEpochBVs { .. } | UnknownEpochEV { .. } | UndecidedBR { .. }
            | UndecidedER { .. } => FaultClass::Stale,
            UnknownVoter { .. } | MismatchedBR { .. } | MismatchedER { .. } => FaultClass::Malicious,
        }
    }
}

/// Result type for LLR operations.
pub type LlrResult<T> = Result<T, LlrError>;
