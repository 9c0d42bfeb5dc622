//! Bill Finalization.
//!
//! Closes out an order/table pair: the order is forced to completed/paid
//! (operator override, deliberately ignoring the normal status
//! progression), the table is released through the state machine's
//! universal clearing rule, and both records are re-fetched afterwards so
//! local state reconciles to store truth. This operation is the one most
//! likely to race a concurrent kitchen-side status update.

use std::sync::Arc;

use shared::util::now_millis;
use shared::{NotificationKind, Order, OrderStatus, PaymentStatus, Priority, Table, TableStatus};
use tracing::{info, warn};

use crate::error::PosResult;
use crate::notify::{Correlation, Notifier};
use crate::store::PosStore;
use crate::tables::{self, TableEvent};

#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// Bill settled, table freed. Both values re-fetched from the store.
    Closed {
        order: Option<Order>,
        table: Table,
    },
    /// The table was already free; nothing to do. Calling finalize twice
    /// is not an error.
    AlreadyClosed { table: Table },
}

pub struct Billing {
    store: Arc<dyn PosStore>,
    notifier: Arc<Notifier>,
}

impl Billing {
    pub fn new(store: Arc<dyn PosStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn finalize(&self, table_number: &str) -> PosResult<FinalizeOutcome> {
        match self.finalize_inner(table_number).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // A failed finalize must not leave the caller holding a
                // half-updated picture: re-fetch what we can so the UI
                // reconciles to store truth before the error surfaces.
                if let Ok(table) = self.store.get_table(table_number).await {
                    warn!(
                        table = %table_number,
                        status = ?table.status,
                        "finalize failed, state re-fetched for reconciliation"
                    );
                }
                Err(e)
            }
        }
    }

    async fn finalize_inner(&self, table_number: &str) -> PosResult<FinalizeOutcome> {
        let mut table = self.store.get_table(table_number).await?;

        if table.status == TableStatus::Available && table.current_order.is_none() {
            return Ok(FinalizeOutcome::AlreadyClosed { table });
        }

        // Settle the bound order, if there is one. Operator override:
        // completed/paid regardless of where the kitchen got to.
        let order_id = table.current_order.clone();
        if let Some(order_id) = &order_id {
            match self.store.get_order(order_id).await {
                Ok(mut order) => {
                    if order.status.is_open() {
                        order.status = OrderStatus::Completed;
                        order.payment_status = PaymentStatus::Paid;
                        order.updated_at = now_millis();
                        self.store.update_order(&order).await?;
                    } else {
                        // Closed out of band (cancelled, or settled from
                        // another terminal); only the table release is
                        // left to do.
                        warn!(
                            table = %table_number,
                            order_id = %order_id,
                            status = %order.status,
                            "bound order already closed, skipping settlement"
                        );
                    }
                }
                Err(crate::store::StoreError::NotFound(_)) => {
                    // Dangling reference; free the table anyway.
                    warn!(table = %table_number, order_id = %order_id, "bound order missing, freeing table");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tables::apply(&mut table, TableEvent::FinalizeBill)?;
        self.store.update_table(&table).await?;

        // Reconcile to authoritative state.
        let table = self.store.get_table(table_number).await?;
        let order = match &order_id {
            Some(id) => self.store.get_order(id).await.ok(),
            None => None,
        };

        info!(
            table = %table_number,
            order_id = ?order_id,
            "bill finalized, table released"
        );
        if let Some(order) = &order {
            self.notifier.emit(
                NotificationKind::Payment,
                "Bill Finalized",
                format!(
                    "Bill {} settled for table {table_number}",
                    order.bill_number
                ),
                Priority::Medium,
                Correlation {
                    order_id: Some(order.id.clone()),
                    table_number: Some(table_number.to_string()),
                    staff_id: None,
                },
            );
        }

        Ok(FinalizeOutcome::Closed { order, table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateConfig;
    use crate::db;
    use crate::error::PosError;
    use crate::orders::{OrderEngine, SubmitRequest};
    use crate::sequence::SequenceAllocator;
    use crate::store::memory::MemoryStore;
    use parking_lot::RwLock;
    use shared::{CartLine, OrderType};

    async fn seeded() -> (Arc<MemoryStore>, Billing, Order) {
        let store = Arc::new(MemoryStore::with_tables(2));
        let notifier = Arc::new(Notifier::new(50));
        let engine = OrderEngine::new(
            store.clone(),
            Arc::new(SequenceAllocator::new(db::open_in_memory().unwrap(), 1001)),
            notifier.clone(),
            Arc::new(RwLock::new(RateConfig::default())),
        );
        let req = SubmitRequest {
            order_type: OrderType::DineIn,
            table_number: Some("T01".into()),
            ..SubmitRequest::default()
        };
        let (order, _) = engine
            .submit(&[CartLine::new("dal", "DAL", 120.0)], &req)
            .await
            .unwrap();
        (store.clone(), Billing::new(store, notifier), order)
    }

    #[tokio::test]
    async fn finalize_settles_order_and_frees_table() {
        let (store, billing, order) = seeded().await;

        let outcome = billing.finalize("T01").await.unwrap();
        let FinalizeOutcome::Closed { order: settled, table } = outcome else {
            panic!("expected Closed outcome");
        };
        let settled = settled.unwrap();
        assert_eq!(settled.id, order.id);
        assert_eq!(settled.status, OrderStatus::Completed);
        assert_eq!(settled.payment_status, PaymentStatus::Paid);

        assert_eq!(table.status, TableStatus::Available);
        assert!(table.current_order.is_none());
        assert!(table.customer_name.is_none());
        assert!(table.staff.is_none());

        // the store agrees
        let fetched = store.get_table("T01").await.unwrap();
        assert_eq!(fetched.status, TableStatus::Available);
    }

    #[tokio::test]
    async fn finalize_overrides_any_prior_status() {
        let (store, billing, mut order) = seeded().await;
        order.status = OrderStatus::Preparing;
        store.update_order(&order).await.unwrap();

        billing.finalize("T01").await.unwrap();
        let fetched = store.get_order(&order.id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn second_finalize_is_a_noop() {
        let (store, billing, order) = seeded().await;
        billing.finalize("T01").await.unwrap();

        let before = store.get_order(&order.id).await.unwrap();
        let outcome = billing.finalize("T01").await.unwrap();
        assert!(matches!(outcome, FinalizeOutcome::AlreadyClosed { .. }));

        // no duplicate order mutation
        let after = store.get_order(&order.id).await.unwrap();
        assert_eq!(before.updated_at, after.updated_at);
    }

    #[tokio::test]
    async fn finalize_after_cancel_does_not_resurrect_the_order() {
        let store = Arc::new(MemoryStore::with_tables(1));
        let notifier = Arc::new(Notifier::new(50));
        let engine = OrderEngine::new(
            store.clone(),
            Arc::new(SequenceAllocator::new(db::open_in_memory().unwrap(), 1001)),
            notifier.clone(),
            Arc::new(RwLock::new(RateConfig::default())),
        );
        let req = SubmitRequest {
            order_type: OrderType::DineIn,
            table_number: Some("T01".into()),
            ..SubmitRequest::default()
        };
        let (order, _) = engine
            .submit(&[CartLine::new("dal", "DAL", 120.0)], &req)
            .await
            .unwrap();
        engine.cancel(&order.id, "guest left").await.unwrap();

        // cancellation released the binding and sent the table to cleaning,
        // so there is nothing left to finalize there
        let billing = Billing::new(store.clone(), notifier);
        let err = billing.finalize("T01").await.unwrap_err();
        assert!(matches!(err, PosError::Table(_)));

        let fetched = store.get_order(&order.id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Cancelled);
        assert_eq!(fetched.payment_status, PaymentStatus::Pending);

        let table = store.get_table("T01").await.unwrap();
        assert_eq!(table.status, TableStatus::Cleaning);
        assert!(table.current_order.is_none());
    }

    #[tokio::test]
    async fn finalize_skips_settling_an_already_closed_order() {
        let (store, billing, order) = seeded().await;
        let mut closed = store.get_order(&order.id).await.unwrap();
        closed.status = OrderStatus::Cancelled;
        store.update_order(&closed).await.unwrap();

        // table is still bound; finalize frees it without rewriting the
        // closed order
        let outcome = billing.finalize("T01").await.unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Closed { .. }));

        let fetched = store.get_order(&order.id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Cancelled);
        assert_eq!(fetched.payment_status, PaymentStatus::Pending);
        assert_eq!(
            store.get_table("T01").await.unwrap().status,
            TableStatus::Available
        );
    }

    #[tokio::test]
    async fn finalize_unknown_table_surfaces_not_found() {
        let (_, billing, _) = seeded().await;
        let err = billing.finalize("T99").await.unwrap_err();
        assert!(matches!(err, PosError::NotFound(_)));
    }
}
