//! pwk-testkit
//!
//! Deterministic in-process doubles for the entitlement core:
//! - [`ScriptedPlatform`]: a commerce platform driven entirely by the test.
//! - [`RecordingObserver`] / [`RecordingNotifier`]: capture what the store and
//!   the purchase flows emit.
//!
//! No network, no clock (beyond optional tokio sleeps), no randomness.

mod platform;
mod recorders;

use std::sync::Arc;

use pwk_catalog::{Catalog, Micros, Product, ProductIds, SubscriptionPeriod};
use pwk_entitlement::{EntitlementStore, KeyValueStore, MemoryKv};
use pwk_reconcile::EntitlementReconciler;

pub use platform::ScriptedPlatform;
pub use recorders::{RecordingNotifier, RecordingObserver};

pub const MONTHLY_ID: &str = "premium.monthly";
pub const YEARLY_ID: &str = "premium.yearly";

/// $9.99 / month and $39.99 / year (free trial), in that order.
pub fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        Product::new(
            MONTHLY_ID,
            Micros::new(9_990_000),
            "$9.99",
            SubscriptionPeriod::monthly(),
        )
        .with_display_name("Monthly"),
        Product::new(
            YEARLY_ID,
            Micros::new(39_990_000),
            "$39.99",
            SubscriptionPeriod::yearly(),
        )
        .with_display_name("Yearly")
        .with_free_trial(true),
    ])
}

pub fn known_ids() -> ProductIds {
    sample_catalog().product_ids()
}

/// Fresh store on an empty in-memory kv. Returns the kv handle so tests can
/// count writes or "restart" by opening a second store on a clone.
pub fn memory_store() -> (Arc<EntitlementStore>, MemoryKv) {
    let kv = MemoryKv::new();
    let store = store_on(Arc::new(kv.clone()));
    (store, kv)
}

pub fn store_on(kv: Arc<dyn KeyValueStore>) -> Arc<EntitlementStore> {
    Arc::new(EntitlementStore::open_default(kv))
}

/// Fully wired reconciler over a scripted platform and an in-memory store,
/// with a recording observer already subscribed.
pub struct Harness {
    pub platform: Arc<ScriptedPlatform>,
    pub kv: MemoryKv,
    pub store: Arc<EntitlementStore>,
    pub observer: Arc<RecordingObserver>,
    pub notifier: Arc<RecordingNotifier>,
    pub reconciler: Arc<EntitlementReconciler>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_platform(
            ScriptedPlatform::new().with_products(sample_catalog().products().to_vec()),
        )
    }

    pub fn with_platform(platform: ScriptedPlatform) -> Self {
        let platform = Arc::new(platform);
        let (store, kv) = memory_store();
        let observer = Arc::new(RecordingObserver::new());
        store.subscribe(observer.clone());
        let notifier = Arc::new(RecordingNotifier::new());
        let reconciler = Arc::new(
            EntitlementReconciler::new(platform.clone(), Arc::clone(&store))
                .with_notifier(notifier.clone()),
        );
        Self {
            platform,
            kv,
            store,
            observer,
            notifier,
            reconciler,
        }
    }
}
