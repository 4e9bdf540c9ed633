//! Error types for the validation chain.

use shared_types::{Epoch, EventId, FaultClass, Lamport, ValidatorId};
use thiserror::Error;

/// Validation chain errors.
///
/// One variant per rejection cause; callers dispatch on [`fault_class`]
/// rather than matching variants.
///
/// [`fault_class`]: ValidationError::fault_class
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    // --- basic ---
    /// Unsupported event format version.
    #[error("unsupported event version {version}")]
    UnsupportedVersion { version: u8 },

    /// A numeric field is implausibly large.
    #[error("field {field} is out of bounds")]
    HugeValue { field: &'static str },

    /// Creation or median time is zero.
    #[error("zero creation/median time")]
    ZeroTime,

    /// `seq == 1` must have no self-parent; `seq > 1` must have one.
    #[error("self-parent presence does not match seq {seq}")]
    MalformedSelfParent { seq: u32 },

    /// Too many parent references.
    #[error("{count} parents exceeds limit {limit}")]
    TooManyParents { count: usize, limit: usize },

    /// The same parent is referenced twice.
    #[error("duplicate parent reference")]
    DuplicateParents,

    /// Oversized `extra` field.
    #[error("extra field of {size} bytes exceeds limit {limit}")]
    ExtraTooLarge { size: usize, limit: usize },

    /// Transaction gas limit below intrinsic gas.
    #[error("intrinsic gas {required} exceeds tx gas limit {limit}")]
    IntrinsicGas { required: u64, limit: u64 },

    /// Transaction tip above its fee cap.
    #[error("tip exceeds fee cap")]
    TipAboveFeeCap,

    /// Transaction gas limit above the block hard limit.
    #[error("tx gas limit {limit} exceeds block hard limit {hard_limit}")]
    TxGasAboveHardLimit { limit: u64, hard_limit: u64 },

    /// Block-votes payload with no votes, or a zero start height.
    #[error("malformed votes payload")]
    MalformedVotes,

    /// Vote for an epoch later than the carrying event's.
    #[error("vote for future epoch {vote_epoch} inside epoch {epoch} event")]
    VotesFromFuture { vote_epoch: Epoch, epoch: Epoch },

    /// Vote payload creator differs from the event creator.
    #[error("votes signed by {votes_creator} inside event by {creator}")]
    WrongVotesCreator {
        votes_creator: ValidatorId,
        creator: ValidatorId,
    },

    /// The two halves of a misbehaviour proof do not describe a crime.
    #[error("no crime in misbehaviour proof")]
    NoCrimeInMP,

    /// Misbehaviour proof outside the liability window.
    #[error("misbehaviour proof for epoch {proof_epoch} is too late at epoch {epoch}")]
    MPTooLate { proof_epoch: Epoch, epoch: Epoch },

    // --- epoch ---
    /// Event from a non-current epoch; re-queue once epochs catch up.
    #[error("event epoch {epoch} is not relevant (current {current})")]
    NotRelevant { epoch: Epoch, current: Epoch },

    /// Creator is not in the current validator set.
    #[error("unknown creator {creator} in epoch {epoch}")]
    UnknownCreator { creator: ValidatorId, epoch: Epoch },

    // --- parents ---
    /// A parent is not connected yet; fetch and retry.
    #[error("unknown parent {parent:?}")]
    UnknownParent { parent: EventId },

    /// `seq > 1` with no self-parent.
    #[error("missing self-parent for seq > 1")]
    NoSelfParent,

    /// Self-parent was created by another validator, or another parent by
    /// the event's own creator.
    #[error("wrong self-parent linkage")]
    WrongSelfParent,

    /// Sequence does not continue the self-parent chain.
    #[error("wrong seq {actual}, expected {expected}")]
    WrongSeq { expected: u32, actual: u32 },

    /// Lamport time is not `max(parents) + 1`.
    #[error("wrong lamport {actual}, expected {expected}")]
    WrongLamport { expected: Lamport, actual: Lamport },

    /// A parent from a later epoch.
    #[error("parent {parent:?} from a later epoch")]
    WrongParentEpoch { parent: EventId },

    // --- heavy ---
    /// No public key known for the creator in that epoch.
    #[error("no public key for {creator} in epoch {epoch}")]
    UnknownPubkey { creator: ValidatorId, epoch: Epoch },

    /// Event signature does not verify.
    #[error("wrong signature by {creator}")]
    WrongSignature { creator: ValidatorId },

    /// Payload hash does not match the recomputed payload.
    #[error("wrong payload hash")]
    WrongPayloadHash,

    /// An event-carried vote wrapper has an invalid signature.
    #[error("wrong signature on vote payload")]
    WrongVotesSignature,

    /// A misbehaviour-proof half carries an invalid signature.
    #[error("wrong signature inside misbehaviour proof")]
    WrongMPSignature,

    /// A wrong-vote proof references a result this node has not decided yet.
    #[error("misbehaviour proof references undecided result at index {index}")]
    MPNotDecidedYet { index: u64 },

    // --- gaspower ---
    /// Creation time not after the self-parent's.
    #[error("creation time is not monotonic against self-parent")]
    NonMonotonicTime,

    /// Declared gas power exceeds the computed allocation.
    #[error("gas power {used} exceeds available {available} in window {window}")]
    GasPowerTooHigh {
        used: u64,
        available: u64,
        window: usize,
    },

    /// Declared remaining gas power differs from the computed value.
    #[error("declared gas power left {declared} != computed {computed} in window {window}")]
    WrongGasPowerLeft {
        declared: u64,
        computed: u64,
        window: usize,
    },
}

impl ValidationError {
    /// Exhaustive mapping into the caller-facing fault classes.
    pub fn fault_class(&self) -> FaultClass {
        use ValidationError::*;
        match self {
            NotRelevant { .. } | UnknownParent { .. } | MPNotDecidedYet { .. } => FaultClass::Stale,
            UnsupportedVersion { .. }
            | HugeValue { .. }
            | ZeroTime
            | MalformedSelfParent { .. }
            | TooManyParents { .. }
            | DuplicateParents
            | ExtraTooLarge { .. }
            | IntrinsicGas { .. }
            | TipAboveFeeCap
            | TxGasAboveHardLimit { .. }
            | MalformedVotes
            | VotesFromFuture { .. }
            | WrongVotesCreator { .. }
            | NoCrimeInMP
            | MPTooLate { .. }
            | UnknownCreator { .. }
            | NoSelfParent
            | WrongSelfParent
            | WrongSeq { .. }
            | WrongLamport { .. }
            | WrongParentEpoch { .. }
            | UnknownPubkey { .. }
            | WrongSignature { .. }
            | WrongPayloadHash
            | WrongVotesSignature
            | WrongMPSignature
            | NonMonotonicTime
            | GasPowerTooHigh { .. }
            | WrongGasPowerLeft { .. } => FaultClass::Malicious,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
