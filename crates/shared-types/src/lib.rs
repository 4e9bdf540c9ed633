//! # shared-types
//!
//! Core domain entities for Quasar-DAG.
//!
//! ## Clusters
//!
//! - **DAG**: [`Event`], [`EventLocator`], parent references, gas power
//! - **Chain**: [`Block`], [`SignedTransaction`], [`Receipt`]
//! - **Consensus & Epochs**: [`ValidatorSet`], [`BlockState`], [`EpochState`]
//! - **LLR**: [`BlockVotes`], [`EpochVote`], full records, [`LlrState`]
//! - **Accountability**: [`MisbehaviourProof`]
//!
//! Every subsystem consumes these definitions; no subsystem redefines them.

pub mod consensus;
pub mod entities;
pub mod errors;
pub mod hashing;
pub mod ids;
pub mod mp;
pub mod rules;
pub mod state;
pub mod validators;
pub mod votes;

pub use consensus::{ConsensusBlock, ConsensusCallbacks};
pub use entities::{
    Block, GasPowerLeft, LogEntry, Receipt, SignedTransaction, LONG_TERM_WINDOW,
    SHORT_TERM_WINDOW,
};
pub use errors::FaultClass;
pub use hashing::{keccak256, Hasher};
pub use ids::{
    Address, BlockHeight, Epoch, EventId, EventSeq, Frame, Hash, Lamport, PublicKey, Signature,
    Timestamp, ValidatorId, NANOS_PER_SEC,
};
pub use mp::{EventLocator, MisbehaviourProof, SignedEventLocator};
pub use rules::{
    BlockRules, DagRules, FlushRules, GasPowerRules, GasPowerWindowRules, Rules,
};
pub use state::{BlockState, EpochState, LlrState, ValidatorBlockState};
pub use validators::{Validator, ValidatorSet};
pub use votes::{
    BlockVotes, EpochVote, FullBlockRecord, FullEpochRecord, SignedBlockVotes, SignedEpochVote,
};

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// Wire/domain event with payload, the unit everything else is built from.
pub use entities::Event;
