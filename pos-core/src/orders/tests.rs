use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::{CartLine, Order, OrderDraft, OrderStatus, OrderType, Priority, Table, TableStatus};

use super::*;
use crate::config::RateConfig;
use crate::db;
use crate::notify::Notifier;
use crate::sequence::SequenceAllocator;
use crate::store::memory::MemoryStore;
use crate::store::{PosStore, StoreResult};

fn engine_with(store: Arc<MemoryStore>) -> (OrderEngine, Arc<Notifier>) {
    let notifier = Arc::new(Notifier::new(50));
    let engine = OrderEngine::new(
        store,
        Arc::new(SequenceAllocator::new(db::open_in_memory().unwrap(), 1001)),
        notifier.clone(),
        Arc::new(RwLock::new(RateConfig::default())),
    );
    (engine, notifier)
}

fn line(id: &str, price: f64, qty: i32) -> CartLine {
    CartLine::new(id, id.to_uppercase(), price).with_quantity(qty)
}

fn dine_in(table: &str) -> SubmitRequest {
    SubmitRequest {
        order_type: OrderType::DineIn,
        table_number: Some(table.to_string()),
        ..SubmitRequest::default()
    }
}

#[tokio::test]
async fn create_path_persists_order_and_occupies_table() {
    let store = Arc::new(MemoryStore::with_tables(2));
    let (engine, notifier) = engine_with(store.clone());

    let lines = vec![line("item-a", 100.0, 2), line("item-b", 50.0, 1)];
    let (order, merged) = engine.submit(&lines, &dine_in("T02")).await.unwrap();

    assert!(!merged);
    assert_eq!(order.order_number, 1001);
    assert_eq!(order.bill_number, "BILL-001001");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, 250.0);
    assert_eq!(order.service_charge, 25.0);
    assert_eq!(order.tax, 49.50);
    assert_eq!(order.total, 324.50);

    let table = store.get_table("T02").await.unwrap();
    assert_eq!(table.status, TableStatus::Occupied);
    assert_eq!(table.current_order.as_deref(), Some(order.id.as_str()));

    let feed = notifier.list();
    assert_eq!(feed[0].title, "New Order");
    assert_eq!(feed[0].priority, Priority::Medium);
    assert_eq!(feed[0].order_id.as_deref(), Some(order.id.as_str()));
}

#[tokio::test]
async fn dine_in_without_table_is_rejected_before_persistence() {
    let store = Arc::new(MemoryStore::with_tables(1));
    let (engine, _) = engine_with(store.clone());

    let req = SubmitRequest {
        order_type: OrderType::DineIn,
        ..SubmitRequest::default()
    };
    let err = engine.submit(&[line("a", 10.0, 1)], &req).await.unwrap_err();
    assert!(matches!(err, PosError::Validation(_)));
    assert!(store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let store = Arc::new(MemoryStore::with_tables(1));
    let (engine, _) = engine_with(store);
    let err = engine.submit(&[], &dine_in("T01")).await.unwrap_err();
    assert!(matches!(err, PosError::Validation(_)));
}

#[tokio::test]
async fn second_submission_merges_into_open_order() {
    let store = Arc::new(MemoryStore::with_tables(2));
    let (engine, _) = engine_with(store.clone());

    let first = vec![line("dal", 120.0, 1), line("naan", 40.0, 2)];
    let (created, _) = engine.submit(&first, &dine_in("T02")).await.unwrap();

    let second = vec![line("naan", 40.0, 1), line("lassi", 60.0, 2)];
    let (merged, was_merge) = engine.submit(&second, &dine_in("T02")).await.unwrap();

    assert!(was_merge);
    assert_eq!(merged.id, created.id);
    // naan bumped, lassi appended
    assert_eq!(merged.items.len(), 3);
    let naan = merged.items.iter().find(|l| l.product_id == "naan").unwrap();
    assert_eq!(naan.quantity, 3);

    // charges are added, not recomputed
    assert_eq!(merged.subtotal, created.subtotal + 160.0);

    // exactly one order for the table, table still occupied
    let orders = store.list_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let table = store.get_table("T02").await.unwrap();
    assert_eq!(table.status, TableStatus::Occupied);
}

#[tokio::test]
async fn takeaway_never_touches_tables() {
    let store = Arc::new(MemoryStore::with_tables(1));
    let (engine, _) = engine_with(store.clone());

    let req = SubmitRequest {
        order_type: OrderType::Takeaway,
        // stray table number on a takeaway is ignored
        table_number: Some("T01".to_string()),
        ..SubmitRequest::default()
    };
    let (order, merged) = engine.submit(&[line("a", 10.0, 1)], &req).await.unwrap();
    assert!(!merged);
    assert!(order.table_number.is_none());
    let table = store.get_table("T01").await.unwrap();
    assert_eq!(table.status, TableStatus::Available);
}

/// Store that hides the open order from the first merge-decision read,
/// reproducing the window where two submissions race one table.
struct RacingStore {
    inner: Arc<MemoryStore>,
    lied_once: AtomicBool,
}

#[async_trait]
impl PosStore for RacingStore {
    async fn insert_order(&self, draft: OrderDraft, key: &str) -> StoreResult<Order> {
        self.inner.insert_order(draft, key).await
    }
    async fn update_order(&self, order: &Order) -> StoreResult<Order> {
        self.inner.update_order(order).await
    }
    async fn get_order(&self, order_id: &str) -> StoreResult<Order> {
        self.inner.get_order(order_id).await
    }
    async fn find_open_order_for_table(&self, table_number: &str) -> StoreResult<Option<Order>> {
        if !self.lied_once.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_open_order_for_table(table_number).await
    }
    async fn orders_with_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        self.inner.orders_with_status(status).await
    }
    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        self.inner.list_orders().await
    }
    async fn get_table(&self, table_number: &str) -> StoreResult<Table> {
        self.inner.get_table(table_number).await
    }
    async fn update_table(&self, table: &Table) -> StoreResult<Table> {
        self.inner.update_table(table).await
    }
    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        self.inner.list_tables().await
    }
}

#[tokio::test]
async fn losing_a_table_race_retries_the_merge_decision_once() {
    let memory = Arc::new(MemoryStore::with_tables(1));
    let (seed_engine, _) = engine_with(memory.clone());
    // The "winner" already landed an open order on T01.
    seed_engine
        .submit(&[line("dal", 120.0, 1)], &dine_in("T01"))
        .await
        .unwrap();

    let racing = Arc::new(RacingStore {
        inner: memory.clone(),
        lied_once: AtomicBool::new(false),
    });
    let notifier = Arc::new(Notifier::new(50));
    let engine = OrderEngine::new(
        racing,
        Arc::new(SequenceAllocator::new(db::open_in_memory().unwrap(), 2001)),
        notifier,
        Arc::new(RwLock::new(RateConfig::default())),
    );

    // First read sees no open order, insert conflicts, retry re-reads and
    // merges instead of surfacing the conflict.
    let (order, merged) = engine
        .submit(&[line("naan", 40.0, 2)], &dine_in("T01"))
        .await
        .unwrap();
    assert!(merged);
    assert_eq!(order.items.len(), 2);
    assert_eq!(memory.list_orders().await.unwrap().len(), 1);
}

/// Store whose first `update_order` lets a competing merge land first,
/// reproducing two terminals updating one table's open order at the same
/// time.
struct InterleavingStore {
    inner: Arc<MemoryStore>,
    interleaved: AtomicBool,
}

#[async_trait]
impl PosStore for InterleavingStore {
    async fn insert_order(&self, draft: OrderDraft, key: &str) -> StoreResult<Order> {
        self.inner.insert_order(draft, key).await
    }
    async fn update_order(&self, order: &Order) -> StoreResult<Order> {
        if !self.interleaved.swap(true, Ordering::SeqCst) {
            let mut competing = self.inner.get_order(&order.id).await?;
            competing.items.push(line("side", 10.0, 1));
            competing.subtotal += 10.0;
            competing.total += 10.0;
            self.inner.update_order(&competing).await?;
        }
        self.inner.update_order(order).await
    }
    async fn get_order(&self, order_id: &str) -> StoreResult<Order> {
        self.inner.get_order(order_id).await
    }
    async fn find_open_order_for_table(&self, table_number: &str) -> StoreResult<Option<Order>> {
        self.inner.find_open_order_for_table(table_number).await
    }
    async fn orders_with_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        self.inner.orders_with_status(status).await
    }
    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        self.inner.list_orders().await
    }
    async fn get_table(&self, table_number: &str) -> StoreResult<Table> {
        self.inner.get_table(table_number).await
    }
    async fn update_table(&self, table: &Table) -> StoreResult<Table> {
        self.inner.update_table(table).await
    }
    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        self.inner.list_tables().await
    }
}

#[tokio::test]
async fn concurrent_merge_conflict_is_retried_without_losing_lines() {
    let memory = Arc::new(MemoryStore::with_tables(1));
    let (seed_engine, _) = engine_with(memory.clone());
    let (created, _) = seed_engine
        .submit(&[line("dal", 120.0, 1)], &dine_in("T01"))
        .await
        .unwrap();

    let store = Arc::new(InterleavingStore {
        inner: memory.clone(),
        interleaved: AtomicBool::new(false),
    });
    let notifier = Arc::new(Notifier::new(50));
    let engine = OrderEngine::new(
        store,
        Arc::new(SequenceAllocator::new(db::open_in_memory().unwrap(), 2001)),
        notifier,
        Arc::new(RwLock::new(RateConfig::default())),
    );

    // The competing write lands between this submission's read and its
    // update; the stale update conflicts, the retry re-reads and merges
    // on top of the competitor instead of overwriting it.
    let (order, merged) = engine
        .submit(&[line("naan", 40.0, 2)], &dine_in("T01"))
        .await
        .unwrap();
    assert!(merged);
    assert_eq!(order.id, created.id);
    assert_eq!(order.items.len(), 3);
    assert!(order.items.iter().any(|l| l.product_id == "side"));
    assert_eq!(
        order
            .items
            .iter()
            .find(|l| l.product_id == "naan")
            .unwrap()
            .quantity,
        2
    );
    // charges stacked on top of the competing write: 120 + 10 + 80
    assert_eq!(order.subtotal, 210.0);
    assert_eq!(memory.list_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_table_rejects_before_any_order_persists() {
    let store = Arc::new(MemoryStore::with_tables(1));
    let (engine, _) = engine_with(store.clone());

    let err = engine
        .submit(&[line("a", 10.0, 1)], &dine_in("T99"))
        .await
        .unwrap_err();
    assert!(matches!(err, PosError::NotFound(_)));
    assert!(store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn status_update_notifies_high_priority_when_ready() {
    let store = Arc::new(MemoryStore::with_tables(1));
    let (engine, notifier) = engine_with(store);

    let (order, _) = engine
        .submit(&[line("a", 10.0, 1)], &dine_in("T01"))
        .await
        .unwrap();

    let updated = engine
        .update_status(&order.id, OrderStatus::Ready)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Ready);

    let feed = notifier.list();
    assert_eq!(feed[0].title, "Order Status Updated");
    assert_eq!(feed[0].priority, Priority::High);
}

#[tokio::test]
async fn cancel_records_reason_and_sends_table_to_cleaning() {
    let store = Arc::new(MemoryStore::with_tables(1));
    let (engine, _) = engine_with(store.clone());

    let (order, _) = engine
        .submit(&[line("a", 10.0, 1)], &dine_in("T01"))
        .await
        .unwrap();

    let cancelled = engine.cancel(&order.id, "guest left").await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled
        .special_instructions
        .as_deref()
        .unwrap()
        .contains("Cancellation Reason: guest left"));

    let table = store.get_table("T01").await.unwrap();
    assert_eq!(table.status, TableStatus::Cleaning);
    // the binding is released along with the hand-off
    assert!(table.current_order.is_none());

    // cancelling twice is a validation error, not a silent overwrite
    let err = engine.cancel(&order.id, "again").await.unwrap_err();
    assert!(matches!(err, PosError::Validation(_)));
}

#[tokio::test]
async fn assign_staff_snapshots_name() {
    let store = Arc::new(MemoryStore::with_tables(1));
    let (engine, _) = engine_with(store);

    let (order, _) = engine
        .submit(&[line("a", 10.0, 1)], &dine_in("T01"))
        .await
        .unwrap();
    let updated = engine
        .assign_staff(&order.id, shared::StaffAssignment::new("staff-3", "Amit Singh"))
        .await
        .unwrap();
    let staff = updated.staff.unwrap();
    assert_eq!(staff.staff_id, "staff-3");
    assert_eq!(staff.snapshot_name, "Amit Singh");
}
