//! Quasar-DAG integration test suite.
//!
//! The [`harness`] wires full single-process networks (storage, validation,
//! ingestion, finality, LLR) and drives them through the same emitter path
//! the node binary uses.

pub mod harness;

#[cfg(test)]
mod integration;
