//! # qd-06-llr-sync
//!
//! The LLR (Late Low Redundancy) track: an asynchronous secondary consensus
//! path that lets nodes bootstrap from majority-signed hashes and full data
//! records instead of replaying the whole DAG.
//!
//! ## Protocol
//!
//! Validators vote on block and epoch record hashes; votes accumulate
//! weighted by stake. The first value whose accumulated weight reaches
//! `W/3 + 1` becomes the decided result: with at most `W/3` Byzantine
//! weight, two different values can never both be decided honestly, so a
//! second value crossing the threshold is logged as detected equivocation.
//!
//! Full records are only applied once their hash matches the decided vote,
//! and watermarks track the first not-yet-decided/filled index with no
//! gaps below it.
//!
//! ## Locking
//!
//! Vote processing runs under the engine lock (the ingestion service wraps
//! it). Record import is validated lock-free ([`LlrProcessor::check_block_record`])
//! and applied under the lock ([`LlrProcessor::apply_block_record`]).

pub mod error;
pub mod processor;
pub mod watermark;

pub use error::{LlrError, LlrResult};
pub use processor::LlrProcessor;
pub use watermark::actualize_lowest_index;
