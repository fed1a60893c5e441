use std::sync::Arc;

use tokio::sync::Notify;

/// One-shot stop request for a single background task.
///
/// A request made while the task is busy is kept as a permit and observed at
/// the task's next wait point. Dropping the signal does not stop the task.
#[derive(Clone, Debug, Default)]
pub(crate) struct ShutdownSignal(Arc<Notify>);

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn trigger(&self) {
        self.0.notify_one();
    }

    pub(crate) async fn requested(&self) {
        self.0.notified().await;
    }
}
