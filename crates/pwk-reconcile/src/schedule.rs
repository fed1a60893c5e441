//! Periodic safety-net checks.
//!
//! Two independent interval tasks call `reconcile_once`:
//!
//! - **short**: only while the host app is active (foreground). A tick
//!   that lands while inactive is skipped, not deferred.
//! - **long**: always.
//!
//! The live event stream is the primary update path; these ticks tolerate
//! drift and missed ticks (`MissedTickBehavior::Skip`). Neither fires
//! immediately on start; the first run is one period later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pwk_catalog::ProductIds;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::shutdown::ShutdownSignal;
use crate::EntitlementReconciler;

// ---------------------------------------------------------------------------
// Intervals / lifecycle
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckIntervals {
    pub short: Duration,
    pub long: Duration,
}

impl CheckIntervals {
    pub fn from_secs(short_secs: u64, long_secs: u64) -> Self {
        Self {
            short: Duration::from_secs(short_secs),
            long: Duration::from_secs(long_secs),
        }
    }
}

impl Default for CheckIntervals {
    /// Five minutes while foregrounded, hourly regardless.
    fn default() -> Self {
        Self::from_secs(300, 3_600)
    }
}

/// Tells the scheduler whether the host app is in the foreground.
pub trait AppLifecycle: Send + Sync {
    /// `true` while the app is active / in the foreground.
    fn is_active(&self) -> bool;
}

/// Lifecycle for hosts without a foreground notion (daemons, CLIs).
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysActive;

impl AppLifecycle for AlwaysActive {
    fn is_active(&self) -> bool {
        true
    }
}

/// Lifecycle flipped by the host's own foreground/background callbacks.
#[derive(Debug, Default)]
pub struct ManualLifecycle {
    active: AtomicBool,
}

impl ManualLifecycle {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

impl AppLifecycle for ManualLifecycle {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeriodicStats {
    pub short_runs: u64,
    /// Short ticks dropped because the app was inactive.
    pub short_skipped: u64,
    pub long_runs: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct TickStats {
    runs: u64,
    skipped: u64,
}

#[derive(Debug)]
pub struct PeriodicChecksHandle {
    short: (ShutdownSignal, JoinHandle<TickStats>),
    long: (ShutdownSignal, JoinHandle<TickStats>),
}

impl PeriodicChecksHandle {
    /// Stop both timers and wait for them. A reconcile already running
    /// completes first.
    pub async fn cancel(self) -> PeriodicStats {
        self.short.0.trigger();
        self.long.0.trigger();
        let short = join_ticker(self.short.1).await;
        let long = join_ticker(self.long.1).await;
        PeriodicStats {
            short_runs: short.runs,
            short_skipped: short.skipped,
            long_runs: long.runs,
        }
    }
}

async fn join_ticker(task: JoinHandle<TickStats>) -> TickStats {
    match task.await {
        Ok(stats) => stats,
        Err(err) => {
            warn!(error = %err, "periodic entitlement check task failed");
            TickStats::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

impl EntitlementReconciler {
    pub fn schedule_periodic_checks(
        self: &Arc<Self>,
        known: ProductIds,
        intervals: CheckIntervals,
        lifecycle: Arc<dyn AppLifecycle>,
    ) -> PeriodicChecksHandle {
        let known = Arc::new(known);

        let short = spawn_ticker(
            Arc::clone(self),
            Arc::clone(&known),
            intervals.short,
            Some(lifecycle),
        );
        let long = spawn_ticker(Arc::clone(self), known, intervals.long, None);

        PeriodicChecksHandle { short, long }
    }
}

fn spawn_ticker(
    reconciler: Arc<EntitlementReconciler>,
    known: Arc<ProductIds>,
    period: Duration,
    gate: Option<Arc<dyn AppLifecycle>>,
) -> (ShutdownSignal, JoinHandle<TickStats>) {
    let shutdown = ShutdownSignal::new();
    let signal = shutdown.clone();
    // interval panics on a zero period.
    let period = period.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut stats = TickStats::default();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = signal.requested() => break,
                _ = ticker.tick() => {}
            }

            if let Some(lifecycle) = &gate {
                if !lifecycle.is_active() {
                    debug!("app inactive; skipping entitlement check");
                    stats.skipped += 1;
                    continue;
                }
            }
            reconciler.reconcile_once(&known).await;
            stats.runs += 1;
        }
        stats
    });

    (shutdown, task)
}
