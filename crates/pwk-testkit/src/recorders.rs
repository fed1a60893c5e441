//! Observers that remember what they saw.

use std::sync::{Mutex, PoisonError};

use pwk_entitlement::{EntitlementObserver, StatusChange};
use pwk_reconcile::{Notice, NoticeKind, Notifier};

#[derive(Debug, Default)]
pub struct RecordingObserver {
    changes: Mutex<Vec<StatusChange>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<StatusChange> {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The `current` side of every recorded change.
    pub fn values(&self) -> Vec<bool> {
        self.changes().iter().map(|c| c.current).collect()
    }
}

impl EntitlementObserver for RecordingObserver {
    fn on_change(&self, change: &StatusChange) {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*change);
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<NoticeKind> {
        self.notices().iter().map(|n| n.kind).collect()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
