//! Weighted validator sets and quorum arithmetic.

use crate::hashing::Hasher;
use crate::ids::{Hash, PublicKey, ValidatorId};
use serde::{Deserialize, Serialize};

/// A validator in the consensus protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// The validator's compact identity.
    pub id: ValidatorId,
    /// Ed25519 public key used to sign events and votes.
    pub pubkey: PublicKey,
    /// Stake weight for voting power and gas power allocation.
    pub weight: u64,
}

/// An epoch's validator set, sorted by id.
///
/// Swapped atomically at epoch seals; never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    total_weight: u64,
}

impl ValidatorSet {
    /// Build a set from (id, pubkey, weight) entries. Zero-weight entries
    /// are dropped; duplicate ids keep the first occurrence.
    pub fn build(entries: impl IntoIterator<Item = Validator>) -> Self {
        let mut validators: Vec<Validator> = Vec::new();
        for v in entries {
            if v.weight == 0 {
                continue;
            }
            if validators.iter().any(|existing| existing.id == v.id) {
                continue;
            }
            validators.push(v);
        }
        validators.sort_by_key(|v| v.id);
        let total_weight = validators.iter().map(|v| v.weight).sum();
        Self {
            validators,
            total_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Main consensus quorum: strictly more than two thirds of total weight.
    pub fn quorum(&self) -> u64 {
        self.total_weight / 3 * 2 + 1
    }

    /// LLR decision threshold: more than one third of total weight, so a
    /// Byzantine minority cannot force two different decided results.
    pub fn llr_threshold(&self) -> u64 {
        self.total_weight / 3 + 1
    }

    pub fn contains(&self, id: ValidatorId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ValidatorId) -> Option<&Validator> {
        self.validators
            .binary_search_by_key(&id, |v| v.id)
            .ok()
            .map(|i| &self.validators[i])
    }

    /// Dense index of `id` within this set, valid for this epoch only.
    pub fn index_of(&self, id: ValidatorId) -> Option<usize> {
        self.validators.binary_search_by_key(&id, |v| v.id).ok()
    }

    pub fn by_index(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = ValidatorId> + '_ {
        self.validators.iter().map(|v| v.id)
    }

    /// The set minus the given validators, weights re-totalled.
    pub fn without(&self, excluded: &[ValidatorId]) -> ValidatorSet {
        Self::build(
            self.validators
                .iter()
                .filter(|v| !excluded.contains(&v.id))
                .copied(),
        )
    }

    pub fn hash(&self) -> Hash {
        let mut h = Hasher::new();
        h.u64(self.validators.len() as u64);
        for v in &self.validators {
            h.u32(v.id.0).bytes(&v.pubkey).u64(v.weight);
        }
        h.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(weights: &[(u32, u64)]) -> ValidatorSet {
        ValidatorSet::build(weights.iter().map(|(id, w)| Validator {
            id: ValidatorId(*id),
            pubkey: [*id as u8; 32],
            weight: *w,
        }))
    }

    #[test]
    fn test_build_sorts_and_drops_zero_weight() {
        let s = set(&[(3, 5), (1, 0), (2, 7)]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.by_index(0).unwrap().id, ValidatorId(2));
        assert_eq!(s.total_weight(), 12);
        assert!(!s.contains(ValidatorId(1)));
    }

    #[test]
    fn test_quorum_thresholds() {
        let s = set(&[(1, 10), (2, 10), (3, 10)]);
        assert_eq!(s.total_weight(), 30);
        assert_eq!(s.quorum(), 21);
        assert_eq!(s.llr_threshold(), 11);
    }

    #[test]
    fn test_llr_threshold_rounds_down_total() {
        // W = 10: one third is 3 (integer), threshold is 4.
        let s = set(&[(1, 4), (2, 3), (3, 3)]);
        assert_eq!(s.llr_threshold(), 4);
    }

    #[test]
    fn test_without_removes_cheaters() {
        let s = set(&[(1, 10), (2, 10), (3, 10)]);
        let pruned = s.without(&[ValidatorId(2)]);
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned.total_weight(), 20);
        assert_ne!(s.hash(), pruned.hash());
    }
}
