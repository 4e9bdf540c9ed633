//! Misbehaviour proofs: conviction, no-crime and liability-window paths.

use crate::harness::TestNet;
use qd_01_event_validation::{BasicChecker, ValidationError};
use shared_types::{MisbehaviourProof, Rules, ValidatorId};

/// A confirmed double-sign proof convicts the accused, and the next epoch
/// seal prunes them from the validator set.
#[test]
fn test_doublesign_conviction_prunes_validator() {
    let mut rules = Rules::default();
    rules.blocks.max_epoch_blocks = 1;
    let net = TestNet::with_rules(3, 1, rules);

    // Validator 2 signed two different events for the same (epoch, seq).
    let proof = MisbehaviourProof::EventsDoublesign {
        a: net.signed_locator(2, 1, 5, 10),
        b: net.signed_locator(2, 1, 5, 11),
    };
    net.emit_with(1, 1, |event| {
        event.misbehaviour_proofs.push(proof.clone());
    })
    .unwrap();

    let pair = net.node.store.block_epoch_state();
    assert_eq!(pair.1.epoch, 2);
    assert!(!pair.1.validators.contains(ValidatorId(2)));
    assert!(pair.1.validators.contains(ValidatorId(1)));
    assert!(pair.1.validators.contains(ValidatorId(3)));
    // The conviction list was consumed by the seal.
    assert!(pair.0.cheaters.is_empty());
}

/// Identical halves prove nothing: the event carrying them is rejected
/// outright and leaves no trace.
#[test]
fn test_identical_halves_are_no_crime() {
    let net = TestNet::new(3, 10);
    let half = net.signed_locator(2, 1, 5, 10);
    let proof = MisbehaviourProof::EventsDoublesign { a: half, b: half };

    let err = net
        .emit_with(1, 1, |event| {
            event.misbehaviour_proofs.push(proof.clone());
        })
        .unwrap_err();
    assert!(err.to_string().contains("no crime"));
    assert!(net.node.service.heads().is_empty());
}

/// A proof aimed far enough in the past is rejected as too late, even when
/// both halves are perfectly valid and signed.
#[test]
fn test_liability_window_rejects_old_proofs() {
    let net = TestNet::new(3, 10);
    let rules = Rules::default();
    let checker = BasicChecker::new(rules);

    let proof = MisbehaviourProof::EventsDoublesign {
        a: net.signed_locator(2, 1, 5, 10),
        b: net.signed_locator(2, 1, 5, 11),
    };
    // Locator epoch 1, accusing event 2 + MaxLiableEpochs later.
    let accusing_epoch = 1 + rules.max_liable_epochs + 2;
    assert_eq!(
        checker.validate_mp(&proof, accusing_epoch),
        Err(ValidationError::MPTooLate {
            proof_epoch: 1,
            epoch: accusing_epoch,
        })
    );
    // The same proof is acceptable inside the window.
    assert_eq!(checker.validate_mp(&proof, 1 + rules.max_liable_epochs), Ok(()));
}
