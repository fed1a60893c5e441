//! Scenario: Status Dedup
//!
//! # Invariants under test
//!
//! 1. Setting the value the store already holds writes nothing and notifies
//!    nobody.
//! 2. Each real transition is persisted once and observed once.
//! 3. `reset` forgets the persisted key and notifies only when premium.

use pwk_entitlement::{KeyValueStore, StatusChange, DEFAULT_STATUS_KEY};
use pwk_testkit::{memory_store, RecordingObserver};
use std::sync::Arc;

#[test]
fn repeated_equal_values_are_suppressed() {
    let (store, kv) = memory_store();
    let observer = Arc::new(RecordingObserver::new());
    store.subscribe(observer.clone());

    assert!(!store.set_status(false), "false -> false is not a transition");
    assert_eq!(kv.writes(), 0);

    assert!(store.set_status(true));
    assert!(!store.set_status(true));
    assert!(!store.set_status(true));

    assert_eq!(kv.writes(), 1);
    assert_eq!(
        observer.changes(),
        vec![StatusChange {
            previous: false,
            current: true
        }]
    );
}

#[test]
fn every_transition_is_observed_in_order() {
    let (store, kv) = memory_store();
    let observer = Arc::new(RecordingObserver::new());
    store.subscribe(observer.clone());

    for value in [true, true, false, false, true] {
        store.set_status(value);
    }

    assert_eq!(observer.values(), vec![true, false, true]);
    assert_eq!(kv.writes(), 3);
    assert_eq!(kv.get_bool(DEFAULT_STATUS_KEY).unwrap(), Some(true));
}

#[test]
fn reset_removes_key_and_notifies_once() {
    let (store, kv) = memory_store();
    let observer = Arc::new(RecordingObserver::new());
    store.subscribe(observer.clone());

    store.set_status(true);
    assert!(store.reset());
    assert!(!store.current());
    assert_eq!(kv.get_bool(DEFAULT_STATUS_KEY).unwrap(), None);

    assert!(!store.reset(), "already free");
    assert_eq!(observer.values(), vec![true, false]);
}

#[test]
fn unsubscribed_observer_sees_nothing_further() {
    let (store, _kv) = memory_store();
    let observer = Arc::new(RecordingObserver::new());
    let id = store.subscribe(observer.clone());

    store.set_status(true);
    assert!(store.unsubscribe(id));
    store.set_status(false);

    assert_eq!(observer.count(), 1);
    assert_eq!(store.observer_count(), 0);
}
