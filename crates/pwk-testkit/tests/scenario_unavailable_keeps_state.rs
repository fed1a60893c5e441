//! Scenario: Unavailable Keeps State
//!
//! # Invariants under test
//!
//! 1. `Unavailable` from the snapshot leaves the flag as it was, premium or
//!    free, and returns it.
//! 2. Transient errors (network, platform, mid-stream) behave the same way.
//! 3. An empty snapshot, in contrast, is an authoritative "no entitlement".

use pwk_reconcile::{PlatformError, Transaction, Verification};
use pwk_testkit::{known_ids, Harness, MONTHLY_ID};

#[tokio::test]
async fn unavailable_does_not_downgrade_premium() {
    let h = Harness::new();
    h.store.set_status(true);
    h.platform.fail_snapshot(Some(PlatformError::Unavailable));

    assert!(h.reconciler.reconcile_once(&known_ids()).await);
    assert!(h.store.current());
    assert_eq!(h.observer.values(), vec![true]);
}

#[tokio::test]
async fn unavailable_does_not_upgrade_free() {
    let h = Harness::new();
    h.platform.grant(MONTHLY_ID);
    h.platform.fail_snapshot(Some(PlatformError::Unavailable));

    assert!(!h.reconciler.reconcile_once(&known_ids()).await);
    assert_eq!(h.kv.writes(), 0);
}

#[tokio::test]
async fn transient_errors_keep_last_known_value() {
    let h = Harness::new();
    h.store.set_status(true);

    h.platform
        .fail_snapshot(Some(PlatformError::Network("timeout".to_string())));
    assert!(h.reconciler.reconcile_once(&known_ids()).await);

    h.platform.fail_snapshot(None);
    h.platform.set_entitlement_items(vec![Err(PlatformError::Platform {
        code: Some(500),
        message: "backend".to_string(),
    })]);
    assert!(h.reconciler.reconcile_once(&known_ids()).await);
    assert!(h.store.current());
}

#[tokio::test]
async fn empty_snapshot_downgrades() {
    let h = Harness::new();
    h.store.set_status(true);
    h.platform.set_entitlements(vec![]);

    assert!(!h.reconciler.reconcile_once(&known_ids()).await);
    assert_eq!(h.observer.values(), vec![true, false]);
}

#[tokio::test]
async fn recovery_after_unavailable_applies_snapshot() {
    let h = Harness::new();
    h.store.set_status(true);
    h.platform.fail_snapshot(Some(PlatformError::Unavailable));
    h.reconciler.reconcile_once(&known_ids()).await;

    h.platform.fail_snapshot(None);
    h.platform.set_entitlements(vec![Verification::Verified(
        Transaction::new(1, MONTHLY_ID).revoked(),
    )]);
    assert!(!h.reconciler.reconcile_once(&known_ids()).await);
    assert!(!h.store.current());
}
