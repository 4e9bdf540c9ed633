//! # qd-01-event-validation
//!
//! Event validation chain for Quasar-DAG.
//!
//! ## Architecture
//!
//! Incoming events pass through five independent checkers, composed in a
//! fixed order so cheap local checks run before checks requiring context:
//!
//! ```text
//! basic ──→ epoch ──→ parents ──→ heavy ──→ gaspower
//! (shape)   (relevant) (causality) (crypto)  (rate limit)
//! ```
//!
//! Each checker signals a distinct error so callers can tell "malicious"
//! from "stale, retry later" from "already known". Signature verification
//! is deliberately last-but-one: it is the CPU-costly step and is batched
//! over a rayon pool.
//!
//! Misbehaviour proofs ride inside events and are validated here too:
//! structure and liability window in [`BasicChecker`], signatures and
//! did-a-crime-actually-happen semantics in [`HeavyChecker`].

pub mod basic;
pub mod epoch;
pub mod error;
pub mod gaspower;
pub mod heavy;
pub mod parents;
pub mod pipeline;
pub mod ports;

pub use basic::BasicChecker;
pub use epoch::EpochChecker;
pub use error::{ValidationError, ValidationResult};
pub use gaspower::GasPowerChecker;
pub use heavy::HeavyChecker;
pub use parents::ParentsChecker;
pub use pipeline::Checkers;
pub use ports::{DecidedReader, EpochReader, EventReader};
