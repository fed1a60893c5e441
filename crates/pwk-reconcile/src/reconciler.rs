//! Reconcile-once: recompute the premium flag from the platform snapshot.
//!
//! # Invariants
//!
//! - Result = OR over records that are verified, not revoked and for a known
//!   product id. Iteration stops at the first match.
//! - `store.set_status(result)` runs before the call returns. Overlapping
//!   calls each write their own complete answer; the store's locked
//!   compare-and-skip makes the last completed call win.
//! - `Unavailable` → no-op, return the last known value.
//! - Any other error (call or mid-stream) → log, store untouched, return the
//!   last known value. Never propagates.

use std::sync::Arc;

use futures_util::StreamExt;
use pwk_catalog::{Catalog, ProductIds};
use pwk_entitlement::EntitlementStore;
use tracing::{debug, warn};

use crate::{CommercePlatform, NoopNotifier, Notifier, PlatformError, Verification};

pub struct EntitlementReconciler {
    pub(crate) platform: Arc<dyn CommercePlatform>,
    pub(crate) store: Arc<EntitlementStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl EntitlementReconciler {
    pub fn new(platform: Arc<dyn CommercePlatform>, store: Arc<EntitlementStore>) -> Self {
        Self {
            platform,
            store,
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &Arc<EntitlementStore> {
        &self.store
    }

    /// Recompute the flag from the current-entitlements snapshot and push it
    /// into the store. Returns this call's computed entitlement, or the last
    /// known value when the snapshot could not be read.
    pub async fn reconcile_once(&self, known: &ProductIds) -> bool {
        match self.scan_entitlements(known).await {
            Ok(active) => {
                self.store.set_status(active);
                active
            }
            Err(PlatformError::Unavailable) => {
                debug!(
                    platform = self.platform.name(),
                    "commerce platform unavailable; keeping last known entitlement"
                );
                self.store.current()
            }
            Err(err) => {
                warn!(
                    platform = self.platform.name(),
                    error = %err,
                    "entitlement check failed; keeping last known entitlement"
                );
                self.store.current()
            }
        }
    }

    async fn scan_entitlements(&self, known: &ProductIds) -> Result<bool, PlatformError> {
        let mut entitlements = self.platform.current_entitlements().await?;
        while let Some(item) = entitlements.next().await {
            let verification = item?;
            if let Verification::Unverified {
                transaction,
                reason,
            } = &verification
            {
                debug!(
                    transaction_id = transaction.id,
                    product_id = %transaction.product_id,
                    %reason,
                    "skipping unverified entitlement"
                );
                continue;
            }
            if let Some(tx) = verification.active() {
                if known.contains(&tx.product_id) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Fetch the known products, in platform order.
    ///
    /// Ids the platform did not return are logged; products the platform
    /// returned for ids we did not ask for are dropped.
    pub async fn load_catalog(&self, known: &ProductIds) -> Result<Catalog, PlatformError> {
        let products = self.platform.fetch_products(&known.to_vec()).await?;
        let products: Vec<_> = products
            .into_iter()
            .filter(|p| known.contains(&p.id))
            .collect();

        for id in known.iter() {
            if !products.iter().any(|p| p.id == id) {
                warn!(product_id = %id, "product not returned by commerce platform");
            }
        }
        Ok(Catalog::new(products))
    }
}
