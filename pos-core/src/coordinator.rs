//! `PosCoordinator`, the facade one POS terminal drives.
//!
//! Owns the cart, wires the merge engine, table actions, offline queue,
//! sync worker, billing and the notification feed together, and decides
//! per submission whether to persist now or defer to the queue.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use redb::Database;
use shared::util::now_millis;
use shared::{
    CartLine, Notification, Order, OrderStatus, OrderType, StaffAssignment, Table,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::billing::{Billing, FinalizeOutcome};
use crate::cart::Cart;
use crate::charges;
use crate::config::{PosConfig, RateConfig};
use crate::error::{PosError, PosResult};
use crate::notify::Notifier;
use crate::offline::queue::{OfflineQueue, PendingSubmission};
use crate::offline::sync::{SyncEngine, SyncWorker};
use crate::offline::Connectivity;
use crate::orders::{OrderEngine, SubmitOutcome, SubmitRequest};
use crate::sequence::SequenceAllocator;
use crate::store::PosStore;
use crate::tables::{self, TableEvent};

pub struct PosCoordinator {
    store: Arc<dyn PosStore>,
    cart: Mutex<Cart>,
    engine: OrderEngine,
    billing: Billing,
    queue: Arc<OfflineQueue>,
    sync: Arc<SyncEngine>,
    notifier: Arc<Notifier>,
    connectivity: Connectivity,
    rates: Arc<RwLock<RateConfig>>,
    shutdown: CancellationToken,
}

impl PosCoordinator {
    /// Wire a coordinator over an external store and the local redb
    /// database (sequence counter + offline queue).
    pub fn new(store: Arc<dyn PosStore>, local_db: Arc<Database>, config: PosConfig) -> Self {
        let notifier = Arc::new(Notifier::new(config.notification_cap));
        let rates = Arc::new(RwLock::new(config.rates));
        let sequence = Arc::new(SequenceAllocator::new(
            local_db.clone(),
            config.order_number_start,
        ));
        let queue = Arc::new(OfflineQueue::new(local_db));
        let sync = Arc::new(SyncEngine::new(
            queue.clone(),
            store.clone(),
            notifier.clone(),
        ));
        let engine = OrderEngine::new(
            store.clone(),
            sequence,
            notifier.clone(),
            rates.clone(),
        );
        let billing = Billing::new(store.clone(), notifier.clone());

        Self {
            store,
            cart: Mutex::new(Cart::new()),
            engine,
            billing,
            queue,
            sync,
            notifier,
            connectivity: Connectivity::new(true),
            rates,
            shutdown: CancellationToken::new(),
        }
    }

    /// Spawn the background sync worker. Call once; shut down via
    /// [`PosCoordinator::shutdown`].
    pub fn start_sync_worker(&self) -> JoinHandle<()> {
        let worker = SyncWorker::new(
            self.sync.clone(),
            self.connectivity.clone(),
            self.shutdown.child_token(),
        );
        tokio::spawn(worker.run())
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    // ========== Cart ==========

    pub fn add_to_cart(&self, line: CartLine) {
        self.cart.lock().add(line);
    }

    pub fn update_cart_quantity(&self, product_id: &str, quantity: i32) {
        self.cart.lock().update_quantity(product_id, quantity);
    }

    pub fn remove_from_cart(&self, product_id: &str) {
        self.cart.lock().remove(product_id);
    }

    pub fn clear_cart(&self) {
        self.cart.lock().clear();
    }

    pub fn cart_lines(&self) -> Vec<CartLine> {
        self.cart.lock().snapshot()
    }

    pub fn cart_total(&self) -> f64 {
        self.cart.lock().total()
    }

    pub fn cart_item_count(&self) -> i32 {
        self.cart.lock().item_count()
    }

    // ========== Orders ==========

    /// Submit the current cart. The cart is cleared only once the
    /// submission is persisted or durably queued; on any other failure it
    /// stays intact for the operator to retry.
    pub async fn create_order(&self, req: SubmitRequest) -> PosResult<SubmitOutcome> {
        let lines = self.cart.lock().snapshot();
        charges::validate_lines(&lines)?;
        if req.order_type == OrderType::DineIn && req.table_number.is_none() {
            return Err(PosError::Validation(
                "dine-in order requires a table number".into(),
            ));
        }

        // Known-offline: queue immediately, deferred success.
        if !self.connectivity.is_online() {
            return self.defer(lines, &req);
        }

        match self.engine.submit(&lines, &req).await {
            Ok((order, merged)) => {
                self.cart.lock().clear();
                Ok(SubmitOutcome::Persisted { order, merged })
            }
            Err(PosError::Unavailable(msg)) => {
                warn!(error = %msg, "store unreachable on submit, deferring");
                // Remember the outage so later submissions queue without
                // a failed round-trip first.
                self.connectivity.set_online(false);
                self.defer(lines, &req)
            }
            Err(e) => Err(e),
        }
    }

    fn defer(&self, lines: Vec<CartLine>, req: &SubmitRequest) -> PosResult<SubmitOutcome> {
        let draft = self.engine.build_draft(lines, req)?;
        let entry = self.queue.enqueue(draft)?;
        self.notifier.emit(
            shared::NotificationKind::System,
            "Offline Mode",
            format!(
                "Order #{} queued locally; it will sync when the store is reachable",
                entry.draft.order_number
            ),
            shared::Priority::High,
            crate::notify::Correlation::default(),
        );
        // The submission is durably captured: deferred success, so the
        // operator's cart clears just like a normal submit.
        self.cart.lock().clear();
        Ok(SubmitOutcome::Queued {
            local_id: entry.local_id,
            order_number: entry.draft.order_number,
        })
    }

    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> PosResult<Order> {
        self.engine.update_status(order_id, status).await
    }

    pub async fn cancel_order(&self, order_id: &str, reason: &str) -> PosResult<Order> {
        self.engine.cancel(order_id, reason).await
    }

    pub async fn assign_staff(&self, order_id: &str, staff: StaffAssignment) -> PosResult<Order> {
        self.engine.assign_staff(order_id, staff).await
    }

    /// Order list snapshot for the periodic UI poll.
    pub async fn orders(&self) -> PosResult<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    /// Kitchen/display feed: orders filtered by status.
    pub async fn orders_with_status(&self, status: OrderStatus) -> PosResult<Vec<Order>> {
        Ok(self.store.orders_with_status(status).await?)
    }

    // ========== Billing ==========

    pub async fn finalize_bill_for_table(&self, table_number: &str) -> PosResult<FinalizeOutcome> {
        self.billing.finalize(table_number).await
    }

    // ========== Tables ==========

    async fn table_event(&self, table_number: &str, event: TableEvent) -> PosResult<Table> {
        let mut table = self.store.get_table(table_number).await?;
        tables::apply(&mut table, event)?;
        Ok(self.store.update_table(&table).await?)
    }

    pub async fn reserve_table(
        &self,
        table_number: &str,
        customer_name: &str,
        time: i64,
    ) -> PosResult<Table> {
        self.table_event(
            table_number,
            TableEvent::Reserve {
                customer_name: customer_name.to_string(),
                time,
            },
        )
        .await
    }

    /// Order-driven flow: guests left an occupied table.
    pub async fn send_table_for_cleaning(&self, table_number: &str) -> PosResult<Table> {
        self.table_event(table_number, TableEvent::SendForCleaning).await
    }

    /// Staff override: force a table into cleaning from any state without
    /// touching order or guest fields.
    pub async fn set_table_cleaning(&self, table_number: &str) -> PosResult<Table> {
        let mut table = self.store.get_table(table_number).await?;
        tables::staff_set_cleaning(&mut table);
        Ok(self.store.update_table(&table).await?)
    }

    pub async fn table_cleaned(&self, table_number: &str) -> PosResult<Table> {
        self.table_event(table_number, TableEvent::CleanComplete).await
    }

    pub async fn mark_table_out_of_order(&self, table_number: &str) -> PosResult<Table> {
        self.table_event(table_number, TableEvent::MarkOutOfOrder).await
    }

    pub async fn mark_table_fixed(&self, table_number: &str) -> PosResult<Table> {
        self.table_event(table_number, TableEvent::MarkFixed).await
    }

    pub async fn tables(&self) -> PosResult<Vec<Table>> {
        Ok(self.store.list_tables().await?)
    }

    // ========== Notifications ==========

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifier.list()
    }

    pub fn mark_notification_read(&self, id: &str) -> bool {
        self.notifier.mark_read(id)
    }

    pub fn clear_notifications(&self) {
        self.notifier.clear_all();
    }

    pub fn subscribe_notifications(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    // ========== Connectivity & offline queue ==========

    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Manual drain, for an operator-initiated "sync now".
    pub async fn drain_offline_queue(&self) -> PosResult<crate::offline::sync::DrainReport> {
        self.sync.drain().await
    }

    pub fn pending_submissions(&self) -> PosResult<Vec<PendingSubmission>> {
        Ok(self.queue.entries()?)
    }

    pub fn purge_pending(&self, local_id: &str) -> PosResult<bool> {
        Ok(self.queue.purge(local_id)?)
    }

    // ========== Rates ==========

    pub fn rates(&self) -> RateConfig {
        *self.rates.read()
    }

    pub fn set_rates(&self, rates: RateConfig) {
        *self.rates.write() = rates;
    }

    /// Convenience for reservations made "for now".
    pub fn now(&self) -> i64 {
        now_millis()
    }
}
