//! Purchase and restore flows.
//!
//! Errors here are returned to the caller as values. A verified, unrevoked
//! purchase is itself proof of entitlement, so it grants premium immediately
//! instead of waiting for the platform snapshot to catch up. A revoked one
//! grants nothing and is reported as an error.

use std::fmt;

use pwk_catalog::{Catalog, ProductIds};
use tracing::{info, warn};

use crate::{EntitlementReconciler, Notice, PlatformError, PlatformPurchase, Verification};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Verified and finished. `premium` is the store value afterwards.
    Purchased { product_id: String, premium: bool },
    Cancelled,
    /// Completion will arrive on the transaction update stream.
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseError {
    /// The id is not part of the loaded catalog.
    ProductNotConfigured(String),
    /// The platform returned a transaction it could not verify.
    Unverified { product_id: String, reason: String },
    /// Verified, but already revoked (refund, family-sharing removal).
    Revoked {
        product_id: String,
        transaction_id: u64,
    },
    Platform(PlatformError),
}

impl fmt::Display for PurchaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseError::ProductNotConfigured(id) => {
                write!(f, "product '{id}' is not configured")
            }
            PurchaseError::Unverified { product_id, reason } => {
                write!(f, "purchase of '{product_id}' could not be verified: {reason}")
            }
            PurchaseError::Revoked {
                product_id,
                transaction_id,
            } => write!(
                f,
                "purchase of '{product_id}' was revoked (transaction {transaction_id})"
            ),
            PurchaseError::Platform(err) => write!(f, "purchase failed: {err}"),
        }
    }
}

impl std::error::Error for PurchaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PurchaseError::Platform(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlatformError> for PurchaseError {
    fn from(err: PlatformError) -> Self {
        PurchaseError::Platform(err)
    }
}

impl EntitlementReconciler {
    /// Buy `product_id` from `catalog`.
    pub async fn purchase(
        &self,
        catalog: &Catalog,
        product_id: &str,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        let product = catalog
            .get(product_id)
            .ok_or_else(|| PurchaseError::ProductNotConfigured(product_id.to_string()))?;

        let result = match self.platform.purchase(product).await {
            Ok(result) => result,
            Err(err) => {
                warn!(product_id, error = %err, "purchase failed");
                self.notifier
                    .notify(Notice::error(format!("Purchase failed: {err}")));
                return Err(err.into());
            }
        };

        match result {
            PlatformPurchase::Success(verification) => {
                if let Err(err) = self.platform.finish(verification.transaction()).await {
                    warn!(
                        transaction_id = verification.transaction().id,
                        error = %err,
                        "failed to finish purchase transaction"
                    );
                }
                match verification {
                    Verification::Verified(tx) if tx.revoked => {
                        warn!(product_id, transaction_id = tx.id, "purchase already revoked");
                        self.notifier
                            .notify(Notice::error("Purchase was revoked by the store."));
                        Err(PurchaseError::Revoked {
                            product_id: product_id.to_string(),
                            transaction_id: tx.id,
                        })
                    }
                    Verification::Verified(tx) => {
                        self.store.set_status(true);
                        info!(product_id, transaction_id = tx.id, "purchase completed");
                        self.notifier
                            .notify(Notice::success("Purchase successful. Welcome to Premium!"));
                        Ok(PurchaseOutcome::Purchased {
                            product_id: product_id.to_string(),
                            premium: self.store.current(),
                        })
                    }
                    Verification::Unverified { reason, .. } => {
                        warn!(product_id, %reason, "purchase could not be verified");
                        self.notifier
                            .notify(Notice::error("Purchase could not be verified."));
                        Err(PurchaseError::Unverified {
                            product_id: product_id.to_string(),
                            reason,
                        })
                    }
                }
            }
            PlatformPurchase::Cancelled => {
                info!(product_id, "purchase cancelled by user");
                Ok(PurchaseOutcome::Cancelled)
            }
            PlatformPurchase::Pending => {
                info!(product_id, "purchase pending approval");
                self.notifier
                    .notify(Notice::info("Purchase pending approval."));
                Ok(PurchaseOutcome::Pending)
            }
        }
    }

    /// Sync with the platform backend, then reconcile. Returns the resulting
    /// premium flag.
    pub async fn restore_purchases(&self, known: &ProductIds) -> Result<bool, PurchaseError> {
        if let Err(err) = self.platform.sync().await {
            warn!(error = %err, "restore purchases failed");
            self.notifier
                .notify(Notice::error(format!("Restore failed: {err}")));
            return Err(err.into());
        }

        let premium = self.reconcile_once(known).await;
        if premium {
            self.notifier.notify(Notice::success("Purchases restored."));
        } else {
            self.notifier
                .notify(Notice::info("No active subscription found."));
        }
        Ok(premium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::tests::SnapshotPlatform;
    use pwk_catalog::{Micros, Product, SubscriptionPeriod};
    use pwk_entitlement::{EntitlementStore, MemoryKv};
    use std::sync::Arc;

    #[tokio::test]
    async fn unknown_product_is_not_configured() {
        let store = Arc::new(EntitlementStore::open_default(Arc::new(MemoryKv::new())));
        let r = EntitlementReconciler::new(Arc::new(SnapshotPlatform::with(vec![])), store);
        let catalog = Catalog::new(vec![Product::new(
            "m",
            Micros::new(9_990_000),
            "$9.99",
            SubscriptionPeriod::monthly(),
        )]);

        let err = r.purchase(&catalog, "nope").await.unwrap_err();
        assert_eq!(err, PurchaseError::ProductNotConfigured("nope".to_string()));
        assert_eq!(err.to_string(), "product 'nope' is not configured");
    }

    #[tokio::test]
    async fn restore_with_unavailable_platform_keeps_state() {
        let store = Arc::new(EntitlementStore::open_default(Arc::new(MemoryKv::new())));
        store.set_status(true);
        let r = EntitlementReconciler::new(
            Arc::new(SnapshotPlatform::failing(PlatformError::Unavailable)),
            Arc::clone(&store),
        );
        assert!(r.restore_purchases(&ProductIds::new(["m"])).await.unwrap());
        assert!(store.current());
    }
}
