//! Network rules: the protocol constants every honest node must agree on.

use crate::ids::{Timestamp, NANOS_PER_SEC};
use serde::{Deserialize, Serialize};

/// Structural limits on DAG events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagRules {
    /// Maximum number of parent references per event.
    pub max_parents: usize,
    /// Maximum size of the opaque `extra` field, in bytes.
    pub max_extra_bytes: usize,
}

impl Default for DagRules {
    fn default() -> Self {
        Self {
            max_parents: 10,
            max_extra_bytes: 128,
        }
    }
}

/// Block and epoch boundary rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRules {
    /// Hard ceiling on the cumulative gas power of events included in one
    /// block; events beyond it spill into later blocks.
    pub block_gas_hard_limit: u64,
    /// Seal the epoch once this many blocks have been finalized in it.
    pub max_epoch_blocks: u64,
    /// Seal the epoch once it has lasted this long.
    pub max_epoch_duration: Timestamp,
}

impl Default for BlockRules {
    fn default() -> Self {
        Self {
            block_gas_hard_limit: 20_000_000,
            max_epoch_blocks: 1_000,
            max_epoch_duration: 300 * NANOS_PER_SEC,
        }
    }
}

/// One gas power allocation window.
///
/// A validator's gas power regenerates at `alloc_per_sec` scaled by its stake
/// share, accumulates for at most `max_alloc_period`, and starts at
/// `startup_gas` for a validator with no prior event in the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPowerWindowRules {
    pub alloc_per_sec: u64,
    pub max_alloc_period: Timestamp,
    pub startup_gas: u64,
}

/// Gas power rules for both allocation windows (long-term, short-term).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPowerRules {
    pub long_term: GasPowerWindowRules,
    pub short_term: GasPowerWindowRules,
}

impl Default for GasPowerRules {
    fn default() -> Self {
        Self {
            long_term: GasPowerWindowRules {
                alloc_per_sec: 10_000_000,
                max_alloc_period: 60 * NANOS_PER_SEC,
                startup_gas: 1_000_000,
            },
            short_term: GasPowerWindowRules {
                alloc_per_sec: 50_000_000,
                max_alloc_period: 5 * NANOS_PER_SEC,
                startup_gas: 1_000_000,
            },
        }
    }
}

/// Store commit thresholds; commits are batched, never per-event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushRules {
    /// Commit once this much time has passed since the last commit.
    pub period: Timestamp,
    /// Commit once this many dirty bytes have accumulated.
    pub dirty_bytes: u64,
}

impl Default for FlushRules {
    fn default() -> Self {
        Self {
            period: 30 * NANOS_PER_SEC,
            dirty_bytes: 16 * 1024 * 1024,
        }
    }
}

/// The complete rule set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub dag: DagRules,
    pub blocks: BlockRules,
    pub gas_power: GasPowerRules,
    /// Misbehaviour proofs older than this many epochs (relative to the
    /// accusing event) are rejected as stale.
    pub max_liable_epochs: u64,
    pub flush: FlushRules,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            dag: DagRules::default(),
            blocks: BlockRules::default(),
            gas_power: GasPowerRules::default(),
            max_liable_epochs: 2,
            flush: FlushRules::default(),
        }
    }
}

impl Rules {
    pub fn window(&self, idx: usize) -> &GasPowerWindowRules {
        match idx {
            crate::entities::LONG_TERM_WINDOW => &self.gas_power.long_term,
            _ => &self.gas_power.short_term,
        }
    }
}
