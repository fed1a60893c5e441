//! Scenario: Status Survives Restart
//!
//! # Invariants under test
//!
//! 1. A fresh store over empty persistence starts free.
//! 2. A store opened on the same persistence after a change starts with the
//!    persisted value, without notifying anyone.
//! 3. The same holds for the on-disk JSON backend.

use std::sync::Arc;

use pwk_entitlement::{EntitlementStore, JsonFileKv, MemoryKv, Tier};
use pwk_testkit::{store_on, RecordingObserver};

#[test]
fn memory_backend_restart_restores_premium() {
    let kv = MemoryKv::new();

    let first = store_on(Arc::new(kv.clone()));
    assert!(!first.current());
    first.set_status(true);
    drop(first);

    let second = store_on(Arc::new(kv.clone()));
    let observer = Arc::new(RecordingObserver::new());
    second.subscribe(observer.clone());

    assert!(second.current());
    assert_eq!(second.tier(), Tier::Premium);
    assert_eq!(observer.count(), 0, "loading is not a transition");
}

#[test]
fn json_file_backend_restart_restores_premium() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entitlement.json");

    let first = EntitlementStore::open(Arc::new(JsonFileKv::new(&path)), "is_premium");
    assert!(!first.current(), "missing file means free");
    first.set_status(true);
    assert!(path.exists());
    drop(first);

    let second = EntitlementStore::open(Arc::new(JsonFileKv::new(&path)), "is_premium");
    assert!(second.current());

    second.set_status(false);
    let third = EntitlementStore::open(Arc::new(JsonFileKv::new(&path)), "is_premium");
    assert!(!third.current());
}

#[test]
fn keys_are_independent() {
    let kv = MemoryKv::new();
    let a = EntitlementStore::open(Arc::new(kv.clone()), "app_a");
    a.set_status(true);

    let b = EntitlementStore::open(Arc::new(kv.clone()), "app_b");
    assert!(!b.current());
}
