//! pwk-reconcile
//!
//! Entitlement reconciliation against an external commerce platform.
//!
//! Architectural decisions:
//! - The platform's current-entitlements snapshot is the only truth; a single
//!   transaction event never sets the flag on its own.
//! - Known product ids filter everything; foreign transactions are ignored
//!   and left for their owner to finish.
//! - `Unavailable` and transient platform errors never downgrade a user.
//! - Reconciliation never returns an error; purchase flows return `Result`.
//! - Background work (event stream, periodic checks) runs in cancellable
//!   tokio tasks with explicit start / cancel.

mod notice;
mod platform;
mod purchase;
mod reconciler;
mod schedule;
mod shutdown;
mod stream;

pub use notice::{Notice, NoticeKind, Notifier, NoopNotifier};
pub use platform::{
    CommercePlatform, PlatformError, PlatformPurchase, Transaction, TransactionStream,
    Verification,
};
pub use purchase::{PurchaseError, PurchaseOutcome};
pub use reconciler::EntitlementReconciler;
pub use schedule::{
    AlwaysActive, AppLifecycle, CheckIntervals, ManualLifecycle, PeriodicChecksHandle,
    PeriodicStats,
};
pub use stream::{EventStreamHandle, EventStreamStats};
