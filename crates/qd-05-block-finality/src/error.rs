//! Error types for block finality.

use thiserror::Error;

/// Errors surfaced by the execution layer.
///
/// Inside `EndBlock` any of these is a determinism break: the block
/// boundary was already agreed network-wide, so a local failure to execute
/// it makes further participation unsafe.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    /// The execution layer rejected a transaction in strict mode.
    #[error("invalid transaction at index {index}: {reason}")]
    InvalidTx { index: usize, reason: &'static str },

    /// The state database could not be opened at the requested root.
    #[error("unknown state root")]
    UnknownStateRoot,

    /// The execution layer failed internally.
    #[error("execution failure: {reason}")]
    Internal { reason: String },
}
