//! Cross-subsystem scenarios.

mod atropos;
mod llr_roundtrip;
mod misbehaviour;
mod pipeline;
