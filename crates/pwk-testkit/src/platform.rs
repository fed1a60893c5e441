//! Scripted commerce platform.
//!
//! The test owns every answer the platform gives:
//! - the current-entitlements snapshot (or the error it fails with),
//! - the live update feed (`push_update`), taken once per platform,
//! - purchase results, queued in order; an empty queue grants the product,
//! - sync failures.
//!
//! Finished transaction ids and call counts are recorded for assertions.
//! No network IO; the only timing is the optional snapshot delay.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use pwk_catalog::Product;
use pwk_reconcile::{
    CommercePlatform, PlatformError, PlatformPurchase, Transaction, TransactionStream,
    Verification,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

type UpdateItem = Result<Verification, PlatformError>;

#[derive(Default)]
struct Script {
    products: Vec<Product>,
    entitlements: Vec<UpdateItem>,
    snapshot_error: Option<PlatformError>,
    updates_error: Option<PlatformError>,
    sync_error: Option<PlatformError>,
    snapshot_delay: Option<Duration>,
    purchases: VecDeque<Result<PlatformPurchase, PlatformError>>,
    next_transaction_id: u64,
    finished: Vec<u64>,
    snapshot_calls: u64,
    snapshots_in_flight: u64,
    max_snapshots_in_flight: u64,
    purchase_calls: u64,
    sync_calls: u64,
}

pub struct ScriptedPlatform {
    script: Mutex<Script>,
    updates_tx: Mutex<Option<mpsc::UnboundedSender<UpdateItem>>>,
    updates_rx: Mutex<Option<mpsc::UnboundedReceiver<UpdateItem>>>,
}

impl Default for ScriptedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            script: Mutex::new(Script {
                next_transaction_id: 1_000,
                ..Script::default()
            }),
            updates_tx: Mutex::new(Some(tx)),
            updates_rx: Mutex::new(Some(rx)),
        }
    }

    pub fn with_products(self, products: Vec<Product>) -> Self {
        self.script().products = products;
        self
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- snapshot ------------------------------------------------------------

    /// Replace the current-entitlements snapshot.
    pub fn set_entitlements(&self, records: Vec<Verification>) {
        self.script().entitlements = records.into_iter().map(Ok).collect();
    }

    /// Replace the snapshot with raw items, errors included.
    pub fn set_entitlement_items(&self, items: Vec<UpdateItem>) {
        self.script().entitlements = items;
    }

    /// Append a verified record for `product_id` and return its transaction.
    pub fn grant(&self, product_id: &str) -> Transaction {
        let mut script = self.script();
        let tx = Transaction::new(script.next_transaction_id, product_id);
        script.next_transaction_id += 1;
        script
            .entitlements
            .push(Ok(Verification::Verified(tx.clone())));
        tx
    }

    pub fn clear_entitlements(&self) {
        self.script().entitlements.clear();
    }

    /// Make `current_entitlements` and `fetch_products` fail (`Some`) or
    /// succeed again (`None`).
    pub fn fail_snapshot(&self, err: Option<PlatformError>) {
        self.script().snapshot_error = err;
    }

    /// Sleep before answering `current_entitlements`. The snapshot is read
    /// after the delay.
    pub fn set_snapshot_delay(&self, delay: Option<Duration>) {
        self.script().snapshot_delay = delay;
    }

    // -- live updates --------------------------------------------------------

    /// Deliver one update to the live feed. `false` once the feed is closed.
    pub fn push_update(&self, verification: Verification) -> bool {
        self.send_update(Ok(verification))
    }

    pub fn push_update_error(&self, err: PlatformError) -> bool {
        self.send_update(Err(err))
    }

    fn send_update(&self, item: UpdateItem) -> bool {
        self.updates_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| tx.send(item).is_ok())
    }

    /// End the live feed. Consumers see the stream finish.
    pub fn close_updates(&self) {
        self.updates_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn fail_updates(&self, err: Option<PlatformError>) {
        self.script().updates_error = err;
    }

    // -- purchase / sync -----------------------------------------------------

    /// Queue the answer for the next `purchase` call.
    pub fn script_purchase(&self, result: Result<PlatformPurchase, PlatformError>) {
        self.script().purchases.push_back(result);
    }

    pub fn fail_sync(&self, err: Option<PlatformError>) {
        self.script().sync_error = err;
    }

    // -- observations --------------------------------------------------------

    /// Transaction ids acknowledged via `finish`, in call order.
    pub fn finished_ids(&self) -> Vec<u64> {
        self.script().finished.clone()
    }

    pub fn snapshot_calls(&self) -> u64 {
        self.script().snapshot_calls
    }

    /// Highest number of `current_entitlements` calls seen waiting at once.
    pub fn max_snapshots_in_flight(&self) -> u64 {
        self.script().max_snapshots_in_flight
    }

    pub fn purchase_calls(&self) -> u64 {
        self.script().purchase_calls
    }

    pub fn sync_calls(&self) -> u64 {
        self.script().sync_calls
    }
}

#[async_trait]
impl CommercePlatform for ScriptedPlatform {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>, PlatformError> {
        let script = self.script();
        if let Some(err) = &script.snapshot_error {
            return Err(err.clone());
        }
        Ok(script
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn purchase(&self, product: &Product) -> Result<PlatformPurchase, PlatformError> {
        let mut script = self.script();
        script.purchase_calls += 1;
        if let Some(result) = script.purchases.pop_front() {
            return result;
        }

        let tx = Transaction::new(script.next_transaction_id, product.id.clone());
        script.next_transaction_id += 1;
        script
            .entitlements
            .push(Ok(Verification::Verified(tx.clone())));
        Ok(PlatformPurchase::Success(Verification::Verified(tx)))
    }

    async fn current_entitlements(&self) -> Result<TransactionStream, PlatformError> {
        let delay = {
            let mut script = self.script();
            script.snapshot_calls += 1;
            script.snapshots_in_flight += 1;
            script.max_snapshots_in_flight = script
                .max_snapshots_in_flight
                .max(script.snapshots_in_flight);
            script.snapshot_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script();
        script.snapshots_in_flight -= 1;
        if let Some(err) = &script.snapshot_error {
            return Err(err.clone());
        }
        Ok(stream::iter(script.entitlements.clone()).boxed())
    }

    async fn transaction_updates(&self) -> Result<TransactionStream, PlatformError> {
        if let Some(err) = &self.script().updates_error {
            return Err(err.clone());
        }
        let rx = self
            .updates_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| PlatformError::Platform {
                code: None,
                message: "transaction updates already consumed".to_string(),
            })?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn finish(&self, transaction: &Transaction) -> Result<(), PlatformError> {
        self.script().finished.push(transaction.id);
        Ok(())
    }

    async fn sync(&self) -> Result<(), PlatformError> {
        let mut script = self.script();
        script.sync_calls += 1;
        match &script.sync_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
