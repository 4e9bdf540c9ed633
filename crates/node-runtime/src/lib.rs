//! # node-runtime
//!
//! Wiring for a self-contained Quasar-DAG node: genesis loading, adapter
//! construction and subsystem assembly. The binary in `main.rs` drives a
//! small local chain over these pieces.

pub mod genesis;
pub mod wiring;

pub use genesis::{GenesisAccount, GenesisSpec, GenesisValidator};
pub use wiring::{build_node, Node};
