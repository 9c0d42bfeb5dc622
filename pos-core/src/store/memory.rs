//! In-memory reference store.
//!
//! Single-process stand-in for the external document store. One mutex
//! guards all records, which makes `insert_order`'s existence check and
//! write atomic, the same compare-and-swap-per-table contract the real
//! collaborator provides; order updates are revision-checked under the
//! same lock. A connectivity toggle lets tests and demos exercise the
//! offline queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{Order, OrderDraft, OrderStatus, Table};
use tracing::debug;

use super::{PosStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    orders: HashMap<String, Order>,
    /// Keyed by table number.
    tables: HashMap<String, Table>,
    /// Idempotency key -> order id already created for it.
    processed: HashMap<String, String>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    online: AtomicBool,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            online: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seed `count` available tables numbered `T01..`, capacity 4.
    pub fn with_tables(count: usize) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for i in 1..=count {
                let number = format!("T{i:02}");
                inner
                    .tables
                    .insert(number.clone(), Table::new(format!("table-{i}"), number, 4));
            }
        }
        store
    }

    /// Toggle simulated reachability. While offline every call returns
    /// `StoreError::Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store offline".into()))
        }
    }

    fn alloc_id(&self) -> String {
        format!("order-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Number of idempotency keys the store has accepted. Test hook.
    pub fn processed_count(&self) -> usize {
        self.inner.lock().processed.len()
    }
}

#[async_trait]
impl PosStore for MemoryStore {
    async fn insert_order(&self, draft: OrderDraft, idempotency_key: &str) -> StoreResult<Order> {
        self.check_online()?;
        let mut inner = self.inner.lock();

        // Replay of a key we already wrote: return the original record.
        if let Some(existing_id) = inner.processed.get(idempotency_key) {
            let order = inner.orders.get(existing_id).cloned().ok_or_else(|| {
                StoreError::Internal(format!("processed key points at missing order {existing_id}"))
            })?;
            debug!(idempotency_key, order_id = %order.id, "idempotent replay, returning existing order");
            return Ok(order);
        }

        // One open order per table, checked and written under one lock.
        if let Some(table_number) = &draft.table_number {
            let occupied = inner
                .orders
                .values()
                .any(|o| o.table_number.as_deref() == Some(table_number) && o.status.is_open());
            if occupied {
                return Err(StoreError::Conflict(format!(
                    "table {table_number} already has an open order"
                )));
            }
        }

        let id = self.alloc_id();
        let order = draft.into_order(id.clone());
        inner.orders.insert(id.clone(), order.clone());
        inner.processed.insert(idempotency_key.to_string(), id);
        Ok(order)
    }

    async fn update_order(&self, order: &Order) -> StoreResult<Order> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        let current = match inner.orders.get(&order.id) {
            Some(stored) => stored.revision,
            None => return Err(StoreError::NotFound(format!("order {}", order.id))),
        };
        if current != order.revision {
            return Err(StoreError::Conflict(format!(
                "order {} was modified concurrently (revision {current}, caller had {})",
                order.id, order.revision
            )));
        }
        let mut updated = order.clone();
        updated.revision += 1;
        inner.orders.insert(order.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Order> {
        self.check_online()?;
        self.inner
            .lock()
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))
    }

    async fn find_open_order_for_table(&self, table_number: &str) -> StoreResult<Option<Order>> {
        self.check_online()?;
        Ok(self
            .inner
            .lock()
            .orders
            .values()
            .find(|o| o.table_number.as_deref() == Some(table_number) && o.status.is_open())
            .cloned())
    }

    async fn orders_with_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        self.check_online()?;
        let mut orders: Vec<Order> = self
            .inner
            .lock()
            .orders
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        self.check_online()?;
        let mut orders: Vec<Order> = self.inner.lock().orders.values().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn get_table(&self, table_number: &str) -> StoreResult<Table> {
        self.check_online()?;
        self.inner
            .lock()
            .tables
            .get(table_number)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("table {table_number}")))
    }

    async fn update_table(&self, table: &Table) -> StoreResult<Table> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        if !inner.tables.contains_key(&table.number) {
            return Err(StoreError::NotFound(format!("table {}", table.number)));
        }
        inner.tables.insert(table.number.clone(), table.clone());
        Ok(table.clone())
    }

    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        self.check_online()?;
        let mut tables: Vec<Table> = self.inner.lock().tables.values().cloned().collect();
        tables.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::now_millis;
    use shared::{OrderType, PaymentStatus};

    fn draft_for(table: Option<&str>, n: u64) -> OrderDraft {
        OrderDraft {
            order_number: n,
            bill_number: format!("BILL-{n:06}"),
            table_number: table.map(String::from),
            order_type: if table.is_some() {
                OrderType::DineIn
            } else {
                OrderType::Takeaway
            },
            items: vec![shared::CartLine::new("p1", "Paneer Tikka", 180.0)],
            subtotal: 180.0,
            service_charge: 18.0,
            tax: 35.64,
            total: 233.64,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            staff: None,
            special_instructions: None,
            created_at: now_millis(),
            updated_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn second_open_order_for_table_conflicts() {
        let store = MemoryStore::with_tables(2);
        store.insert_order(draft_for(Some("T01"), 1001), "k1").await.unwrap();
        let err = store
            .insert_order(draft_for(Some("T01"), 1002), "k2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // A different table is fine.
        store.insert_order(draft_for(Some("T02"), 1003), "k3").await.unwrap();
    }

    #[tokio::test]
    async fn idempotent_replay_returns_original_order() {
        let store = MemoryStore::with_tables(1);
        let first = store
            .insert_order(draft_for(Some("T01"), 1001), "key-a")
            .await
            .unwrap();
        let replay = store
            .insert_order(draft_for(Some("T01"), 1001), "key-a")
            .await
            .unwrap();
        assert_eq!(first.id, replay.id);
        assert_eq!(store.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_revision_update_is_rejected() {
        let store = MemoryStore::with_tables(1);
        let created = store
            .insert_order(draft_for(Some("T01"), 1001), "k1")
            .await
            .unwrap();
        let fresh = store.get_order(&created.id).await.unwrap();

        let mut first = fresh.clone();
        first.subtotal = 200.0;
        let updated = store.update_order(&first).await.unwrap();
        assert_eq!(updated.revision, fresh.revision + 1);

        // second writer still holds the old revision
        let mut second = fresh;
        second.subtotal = 300.0;
        let err = store.update_order(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // the first write survived
        let stored = store.get_order(&created.id).await.unwrap();
        assert_eq!(stored.subtotal, 200.0);
    }

    #[tokio::test]
    async fn offline_store_returns_unavailable() {
        let store = MemoryStore::with_tables(1);
        store.set_online(false);
        let err = store.get_table("T01").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        store.set_online(true);
        store.get_table("T01").await.unwrap();
    }
}
