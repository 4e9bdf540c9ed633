//! Parent existence and causal-consistency checks.

use crate::error::{ValidationError, ValidationResult};
use crate::ports::EventReader;
use shared_types::Event;
use std::sync::Arc;

/// Validates an event against its (already-connected) parents: existence,
/// epoch ordering, self-parent linkage and Lamport consistency.
pub struct ParentsChecker<E: EventReader> {
    events: Arc<E>,
}

impl<E: EventReader> ParentsChecker<E> {
    pub fn new(events: Arc<E>) -> Self {
        Self { events }
    }

    pub fn validate(&self, event: &Event) -> ValidationResult<()> {
        if event.seq > 1 && event.self_parent.is_none() {
            return Err(ValidationError::NoSelfParent);
        }

        let mut max_parent_lamport = 0;
        for parent_id in event.parents() {
            let parent = self
                .events
                .event(parent_id)
                .ok_or(ValidationError::UnknownParent { parent: *parent_id })?;
            if parent.epoch > event.epoch {
                return Err(ValidationError::WrongParentEpoch { parent: *parent_id });
            }
            max_parent_lamport = max_parent_lamport.max(parent.lamport);

            let is_self_parent = event.self_parent.as_ref() == Some(parent_id);
            if is_self_parent {
                if parent.creator != event.creator {
                    return Err(ValidationError::WrongSelfParent);
                }
                if parent.seq + 1 != event.seq {
                    return Err(ValidationError::WrongSeq {
                        expected: parent.seq + 1,
                        actual: event.seq,
                    });
                }
            } else if parent.creator == event.creator {
                // Own earlier events may only be referenced through the
                // self-parent chain.
                return Err(ValidationError::WrongSelfParent);
            }
        }

        let expected = max_parent_lamport + 1;
        if event.lamport != expected {
            return Err(ValidationError::WrongLamport {
                expected,
                actual: event.lamport,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixtures::TestEvents;
    use shared_types::{EventId, ValidatorId};

    /// Tiny in-memory EventReader fixture.
    mod fixtures {
        use super::*;
        use std::collections::HashMap;
        use std::sync::Mutex;

        #[derive(Default)]
        pub struct TestEvents {
            inner: Mutex<HashMap<EventId, Arc<Event>>>,
        }

        impl TestEvents {
            pub fn insert(&self, event: Event) -> EventId {
                let id = event.id();
                self.inner.lock().unwrap().insert(id, Arc::new(event));
                id
            }
        }

        impl EventReader for TestEvents {
            fn event(&self, id: &EventId) -> Option<Arc<Event>> {
                self.inner.lock().unwrap().get(id).cloned()
            }
        }
    }

    fn event(creator: u32, seq: u32, lamport: u64) -> Event {
        Event {
            epoch: 1,
            seq,
            creator: ValidatorId(creator),
            lamport,
            creation_time: 1,
            med_time: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_parents_with_seq_above_one_rejected() {
        let store = Arc::new(TestEvents::default());
        let checker = ParentsChecker::new(store);
        let mut e = event(1, 2, 2);
        e.self_parent = None;
        assert_eq!(checker.validate(&e), Err(ValidationError::NoSelfParent));
    }

    #[test]
    fn test_unknown_parent_is_stale() {
        let store = Arc::new(TestEvents::default());
        let checker = ParentsChecker::new(store);
        let mut e = event(1, 1, 2);
        e.other_parents = vec![EventId([7u8; 32])];
        let err = checker.validate(&e).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownParent { .. }));
        assert!(err.fault_class().is_retryable());
    }

    #[test]
    fn test_self_parent_must_share_creator() {
        let store = Arc::new(TestEvents::default());
        let other = event(2, 1, 1);
        let other_id = store.insert(other);
        let checker = ParentsChecker::new(Arc::clone(&store));

        let mut e = event(1, 2, 2);
        e.self_parent = Some(other_id);
        assert_eq!(checker.validate(&e), Err(ValidationError::WrongSelfParent));
    }

    #[test]
    fn test_seq_must_continue_self_parent() {
        let store = Arc::new(TestEvents::default());
        let parent_id = store.insert(event(1, 1, 1));
        let checker = ParentsChecker::new(Arc::clone(&store));

        let mut e = event(1, 3, 2);
        e.self_parent = Some(parent_id);
        assert_eq!(
            checker.validate(&e),
            Err(ValidationError::WrongSeq {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_lamport_must_be_max_parent_plus_one() {
        let store = Arc::new(TestEvents::default());
        let p1 = store.insert(event(1, 1, 1));
        let p2 = store.insert(event(2, 1, 5));
        let checker = ParentsChecker::new(Arc::clone(&store));

        let mut e = event(1, 2, 3);
        e.self_parent = Some(p1);
        e.other_parents = vec![p2];
        assert_eq!(
            checker.validate(&e),
            Err(ValidationError::WrongLamport {
                expected: 6,
                actual: 3
            })
        );

        e.lamport = 6;
        assert_eq!(checker.validate(&e), Ok(()));
    }

    #[test]
    fn test_own_event_as_other_parent_rejected() {
        let store = Arc::new(TestEvents::default());
        let p1 = store.insert(event(1, 1, 1));
        let checker = ParentsChecker::new(Arc::clone(&store));

        let mut e = event(1, 1, 2);
        e.other_parents = vec![p1];
        assert_eq!(checker.validate(&e), Err(ValidationError::WrongSelfParent));
    }
}
