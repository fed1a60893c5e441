//! Live transaction-update consumer.
//!
//! One task per `start_event_stream` call. The task suspends on the next
//! update; it never polls. For every update:
//!
//! | product id | action                                             |
//! |------------|----------------------------------------------------|
//! | unknown    | ignore (no finish, no store mutation)              |
//! | known      | finish with the platform, then `reconcile_once`    |
//!
//! Known transactions are finished whether verified, unverified or revoked;
//! unfinished transactions are re-delivered forever. The flag always comes
//! from the full snapshot, never from the single event, because a user can
//! hold several entitlements at once.
//!
//! Cancellation is only observed while waiting for the next update, so a
//! transaction that has been received is always finished and reconciled
//! before the task exits.

use std::sync::Arc;

use futures_util::StreamExt;
use pwk_catalog::ProductIds;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::shutdown::ShutdownSignal;
use crate::{EntitlementReconciler, PlatformError, Verification};

/// Counters returned when the consumer stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventStreamStats {
    /// Known-product updates finished and reconciled.
    pub handled: u64,
    /// Updates for products we do not sell.
    pub ignored: u64,
    /// Error items yielded by the platform stream.
    pub errors: u64,
}

/// Running consumer. Dropping the handle detaches the task; it keeps running.
#[derive(Debug)]
pub struct EventStreamHandle {
    shutdown: ShutdownSignal,
    task: JoinHandle<EventStreamStats>,
}

impl EventStreamHandle {
    /// Stop consuming and wait for the task. In-flight work completes first.
    pub async fn cancel(self) -> EventStreamStats {
        self.shutdown.trigger();
        self.join().await
    }

    /// Wait for the platform to end the stream without cancelling.
    pub async fn join(self) -> EventStreamStats {
        match self.task.await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "transaction update task failed");
                EventStreamStats::default()
            }
        }
    }

    /// `true` once the task exited (cancelled, stream ended, or failed to start).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl EntitlementReconciler {
    /// Spawn the long-lived transaction-update consumer.
    pub fn start_event_stream(self: &Arc<Self>, known: ProductIds) -> EventStreamHandle {
        let shutdown = ShutdownSignal::new();
        let this = Arc::clone(self);
        let signal = shutdown.clone();
        let task = tokio::spawn(async move { this.consume_updates(known, signal).await });
        EventStreamHandle { shutdown, task }
    }

    async fn consume_updates(
        &self,
        known: ProductIds,
        shutdown: ShutdownSignal,
    ) -> EventStreamStats {
        let mut stats = EventStreamStats::default();

        let mut updates = tokio::select! {
            biased;
            _ = shutdown.requested() => return stats,
            opened = self.platform.transaction_updates() => match opened {
                Ok(s) => s,
                Err(err) => {
                    warn!(
                        platform = self.platform.name(),
                        error = %err,
                        "transaction updates unavailable; live stream not started"
                    );
                    return stats;
                }
            },
        };
        info!(platform = self.platform.name(), "listening for transaction updates");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.requested() => {
                    info!("transaction update stream cancelled");
                    break;
                }
                next = updates.next() => next,
            };
            let Some(item) = next else {
                info!("transaction update stream ended");
                break;
            };
            self.handle_update(item, &known, &mut stats).await;
        }
        stats
    }

    async fn handle_update(
        &self,
        item: Result<Verification, PlatformError>,
        known: &ProductIds,
        stats: &mut EventStreamStats,
    ) {
        let verification = match item {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "transaction update stream error");
                stats.errors += 1;
                return;
            }
        };

        let tx = verification.transaction();
        if !known.contains(&tx.product_id) {
            debug!(
                transaction_id = tx.id,
                product_id = %tx.product_id,
                "ignoring update for unknown product"
            );
            stats.ignored += 1;
            return;
        }

        if let Verification::Unverified { reason, .. } = &verification {
            warn!(transaction_id = tx.id, %reason, "unverified transaction update");
        }
        if let Err(err) = self.platform.finish(tx).await {
            warn!(transaction_id = tx.id, error = %err, "failed to finish transaction");
        }

        self.reconcile_once(known).await;
        stats.handled += 1;
    }
}
