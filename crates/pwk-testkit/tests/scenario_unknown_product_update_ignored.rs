//! Scenario: Unknown Product Update Ignored
//!
//! # Invariants under test
//!
//! 1. An update for a product outside the known set is not finished.
//! 2. It triggers no reconcile: no snapshot fetch, no write, no notification.
//! 3. A known update in the same stream is still handled.

use pwk_reconcile::{Transaction, Verification};
use pwk_testkit::{known_ids, Harness, MONTHLY_ID};

#[tokio::test]
async fn unknown_update_has_no_effect() {
    let h = Harness::new();
    let handle = h.reconciler.start_event_stream(known_ids());

    assert!(h
        .platform
        .push_update(Verification::Verified(Transaction::new(7, "other.app.lifetime"))));
    h.platform.close_updates();

    let stats = handle.join().await;

    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.handled, 0);
    assert!(h.platform.finished_ids().is_empty());
    assert_eq!(h.platform.snapshot_calls(), 0);
    assert_eq!(h.kv.writes(), 0);
    assert_eq!(h.observer.count(), 0);
    assert!(!h.store.current());
}

#[tokio::test]
async fn known_update_after_unknown_is_handled() {
    let h = Harness::new();
    let tx = h.platform.grant(MONTHLY_ID);
    let handle = h.reconciler.start_event_stream(known_ids());

    h.platform
        .push_update(Verification::Verified(Transaction::new(7, "other.app.lifetime")));
    h.platform.push_update(Verification::Verified(tx.clone()));
    h.platform.close_updates();

    let stats = handle.join().await;
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.handled, 1);
    assert_eq!(h.platform.finished_ids(), vec![tx.id]);
    assert!(h.store.current());
    assert_eq!(h.observer.values(), vec![true]);
}
