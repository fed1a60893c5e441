//! Entitlement store: the single premium flag.
//!
//! # Invariants
//!
//! - **Dedup**: `set_status(v)` with `v == current()` is a no-op. No write,
//!   no notification. The commerce platform re-delivers equivalent
//!   snapshots constantly; only real transitions are observable.
//! - **No torn writes**: compare, persist, update and notify happen under one
//!   write lock, so the final value is always one some caller asked for and
//!   observers see transitions in the order they were applied.
//! - **Reads are lock-free**: `current()` is an atomic load.
//! - **Observers are isolated**: a panicking observer is logged and skipped;
//!   delivery to the remaining observers continues. Observers must not call
//!   `set_status` (the write lock is held while they run).

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::KeyValueStore;

/// Persistence key used when the host does not configure one.
pub const DEFAULT_STATUS_KEY: &str = "is_premium";

const BUS_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Tier / StatusChange
// ---------------------------------------------------------------------------

/// State-machine view of the flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn from_premium(is_premium: bool) -> Self {
        if is_premium {
            Tier::Premium
        } else {
            Tier::Free
        }
    }

    pub fn is_premium(self) -> bool {
        matches!(self, Tier::Premium)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload broadcast on every real transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub previous: bool,
    pub current: bool,
}

impl StatusChange {
    pub fn tier(&self) -> Tier {
        Tier::from_premium(self.current)
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Synchronous change listener (UI models, feature gates).
pub trait EntitlementObserver: Send + Sync {
    fn on_change(&self, change: &StatusChange);
}

impl<F> EntitlementObserver for F
where
    F: Fn(&StatusChange) + Send + Sync,
{
    fn on_change(&self, change: &StatusChange) {
        self(change)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

// ---------------------------------------------------------------------------
// EntitlementStore
// ---------------------------------------------------------------------------

pub struct EntitlementStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    current: AtomicBool,
    write_lock: Mutex<()>,
    observers: RwLock<Vec<(ObserverId, Arc<dyn EntitlementObserver>)>>,
    next_observer: AtomicU64,
    bus: broadcast::Sender<StatusChange>,
}

impl fmt::Debug for EntitlementStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitlementStore")
            .field("key", &self.key)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

impl EntitlementStore {
    /// Open the store and initialize the cache from persistence.
    pub fn open(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let (bus, _rx) = broadcast::channel(BUS_CAPACITY);
        let store = Self {
            kv,
            key: key.into(),
            current: AtomicBool::new(false),
            write_lock: Mutex::new(()),
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU64::new(1),
            bus,
        };
        store.load();
        store
    }

    /// Open with [`DEFAULT_STATUS_KEY`].
    pub fn open_default(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::open(kv, DEFAULT_STATUS_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Re-read the persisted flag into the cache. Missing → `false`.
    ///
    /// A read failure is logged and treated as missing. Does not notify.
    pub fn load(&self) -> bool {
        let _w = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let value = match self.kv.get_bool(&self.key) {
            Ok(v) => v.unwrap_or(false),
            Err(err) => {
                warn!(key = %self.key, error = %err, "entitlement read failed; defaulting to free");
                false
            }
        };
        self.current.store(value, Ordering::Release);
        value
    }

    pub fn current(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }

    pub fn tier(&self) -> Tier {
        Tier::from_premium(self.current())
    }

    /// Apply a new status. Returns `true` if a transition happened.
    ///
    /// A persistence failure is logged; the in-memory value and the
    /// notification still follow the platform's answer.
    pub fn set_status(&self, new_value: bool) -> bool {
        let _w = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.current.load(Ordering::Acquire);
        if previous == new_value {
            return false;
        }

        if let Err(err) = self.kv.set_bool(&self.key, new_value) {
            error!(key = %self.key, error = %err, "entitlement persist failed");
        }
        self.current.store(new_value, Ordering::Release);

        let change = StatusChange {
            previous,
            current: new_value,
        };
        info!(
            from = %Tier::from_premium(previous),
            to = %change.tier(),
            "entitlement changed"
        );
        self.broadcast(&change);
        true
    }

    /// Forget the persisted flag and fall back to `Free`.
    pub fn reset(&self) -> bool {
        let _w = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = self.kv.remove(&self.key) {
            error!(key = %self.key, error = %err, "entitlement reset failed");
        }
        let previous = self.current.swap(false, Ordering::AcqRel);
        if !previous {
            return false;
        }
        let change = StatusChange {
            previous,
            current: false,
        };
        info!("entitlement reset to free");
        self.broadcast(&change);
        true
    }

    pub fn subscribe(&self, observer: Arc<dyn EntitlementObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Async view of the same transitions. Slow receivers may lag.
    pub fn watch(&self) -> broadcast::Receiver<StatusChange> {
        self.bus.subscribe()
    }

    fn broadcast(&self, change: &StatusChange) {
        let observers: Vec<(ObserverId, Arc<dyn EntitlementObserver>)> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, observer) in observers {
            let delivered = catch_unwind(AssertUnwindSafe(|| observer.on_change(change)));
            if delivered.is_err() {
                error!(observer = id.0, "entitlement observer panicked; skipped");
            }
        }

        // No receivers is fine.
        let _ = self.bus.send(*change);
    }
}
