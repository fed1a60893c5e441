//! Commerce platform boundary.
//!
//! This module defines **only** the transaction types and the platform
//! trait. Receipt verification, payment and renewal handling all live behind
//! the trait; the reconciler consumes their results.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use pwk_catalog::Product;

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// One purchase / entitlement record as reported by the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Platform-assigned transaction identifier.
    pub id: u64,
    pub product_id: String,
    /// `true` once the platform revoked the purchase (refund, family-sharing
    /// removal, ...).
    pub revoked: bool,
}

impl Transaction {
    pub fn new(id: u64, product_id: impl Into<String>) -> Self {
        Self {
            id,
            product_id: product_id.into(),
            revoked: false,
        }
    }

    pub fn revoked(mut self) -> Self {
        self.revoked = true;
        self
    }
}

/// Platform verification verdict wrapped around a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    Verified(Transaction),
    /// The platform could not verify the signature. Never grants access.
    Unverified {
        transaction: Transaction,
        reason: String,
    },
}

impl Verification {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Verification::Verified(tx) => tx,
            Verification::Unverified { transaction, .. } => transaction,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }

    /// The transaction if it is verified and not revoked.
    pub fn active(&self) -> Option<&Transaction> {
        match self {
            Verification::Verified(tx) if !tx.revoked => Some(tx),
            _ => None,
        }
    }
}

/// Lazy sequence of transaction records.
///
/// Finite for `current_entitlements`, unbounded for `transaction_updates`.
/// An `Err` item reports a failure while iterating.
pub type TransactionStream = BoxStream<'static, Result<Verification, PlatformError>>;

/// Raw result of asking the platform to buy a product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformPurchase {
    Success(Verification),
    /// The user dismissed the payment sheet.
    Cancelled,
    /// Awaiting approval (Ask to Buy, SCA, ...). Completion arrives later on
    /// the transaction update stream.
    Pending,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformError {
    /// No purchasing capability in this environment (not configured,
    /// restricted device, store unreachable at the OS level). Entitlement is
    /// unknown, not absent.
    Unavailable,
    /// Network or transport failure; retry later.
    Network(String),
    /// The platform returned an application-level error.
    Platform { code: Option<i64>, message: String },
}

impl PlatformError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PlatformError::Unavailable)
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Unavailable => write!(f, "commerce platform unavailable"),
            PlatformError::Network(msg) => write!(f, "network error: {msg}"),
            PlatformError::Platform {
                code: Some(c),
                message,
            } => write!(f, "platform error code={c}: {message}"),
            PlatformError::Platform {
                code: None,
                message,
            } => write!(f, "platform error: {message}"),
        }
    }
}

impl std::error::Error for PlatformError {}

// ---------------------------------------------------------------------------
// Platform trait
// ---------------------------------------------------------------------------

/// The in-app-purchase store the application sells through.
///
/// Implementations must be `Send + Sync`; the reconciler shares one instance
/// between the event-stream task, periodic checks and purchase calls.
#[async_trait]
pub trait CommercePlatform: Send + Sync {
    /// Human-readable platform name for logs (e.g. `"app-store"`).
    fn name(&self) -> &'static str;

    /// Products for the given ids. Unknown ids are silently absent.
    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>, PlatformError>;

    async fn purchase(&self, product: &Product) -> Result<PlatformPurchase, PlatformError>;

    /// Finite snapshot of the user's current entitlements. Re-fetchable.
    async fn current_entitlements(&self) -> Result<TransactionStream, PlatformError>;

    /// Live, unbounded feed of transaction updates.
    async fn transaction_updates(&self) -> Result<TransactionStream, PlatformError>;

    /// Acknowledge a transaction. Unfinished transactions are re-delivered.
    async fn finish(&self, transaction: &Transaction) -> Result<(), PlatformError>;

    /// Force a sync with the platform backend (restore purchases).
    async fn sync(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_requires_verified_and_not_revoked() {
        let ok = Verification::Verified(Transaction::new(1, "m"));
        let revoked = Verification::Verified(Transaction::new(2, "m").revoked());
        let unverified = Verification::Unverified {
            transaction: Transaction::new(3, "m"),
            reason: "bad signature".to_string(),
        };

        assert_eq!(ok.active().map(|t| t.id), Some(1));
        assert!(revoked.active().is_none());
        assert!(unverified.active().is_none());
        assert!(!unverified.is_verified());
        assert_eq!(unverified.transaction().id, 3);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            PlatformError::Platform {
                code: Some(2),
                message: "denied".to_string()
            }
            .to_string(),
            "platform error code=2: denied"
        );
        assert!(PlatformError::Unavailable.is_unavailable());
        assert!(!PlatformError::Network("timeout".into()).is_unavailable());
    }
}
