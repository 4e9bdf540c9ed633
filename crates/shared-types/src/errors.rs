//! Cross-subsystem error classification.

/// How a caller should react to a rejected input.
///
/// Every subsystem error maps into exactly one class, so dispatch is
/// exhaustive and compiler-checked rather than identity comparison against
/// sentinel values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultClass {
    /// Structurally invalid or provably dishonest input: penalize the peer,
    /// drop the input, never partially apply.
    Malicious,
    /// Out-of-order or not-yet-relevant input: re-queue once local state
    /// catches up; not an error of trust.
    Stale,
    /// Idempotent re-delivery of something already applied: a no-op, not a
    /// failure.
    Duplicate,
    /// A protocol-level determinism break. Continuing past it risks
    /// diverging from the network; the node must not proceed.
    Fatal,
}

impl FaultClass {
    /// True when the peer that sent the input should be penalized.
    pub fn is_punishable(&self) -> bool {
        matches!(self, FaultClass::Malicious)
    }

    /// True when the caller may retry the same input later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FaultClass::Stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes() {
        assert!(FaultClass::Malicious.is_punishable());
        assert!(!FaultClass::Stale.is_punishable());
        assert!(FaultClass::Stale.is_retryable());
        assert!(!FaultClass::Duplicate.is_retryable());
    }
}
