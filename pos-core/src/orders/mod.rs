//! Order Merge Engine.
//!
//! Decides, for each submission, whether to create a new order or merge
//! into the open order already running at the table, and owns the
//! store-facing order mutations (status updates, cancellation, staff
//! assignment).
//!
//! # Merge decision
//!
//! 1. Dine-in with a table: look up the open order for that table.
//! 2. Found → merge: matching product lines get their quantity bumped,
//!    the rest append; charge components are **added** to the existing
//!    ones rather than recomputed from the merged lines, so manual
//!    adjustments on the original charges survive.
//! 3. Not found → create: allocate order/bill numbers, compute charges
//!    from the current rates, persist as a new record.
//! 4. On dine-in success the table is driven to occupied with the order
//!    bound; a notification goes out; the caller clears the cart only
//!    after persistence succeeded.
//!
//! A `Conflict` (two submissions raced one table's open-order slot, or a
//! concurrent write bumped the order revision under a merge) makes the
//! loser re-read the merge decision exactly once before surfacing.

use std::sync::Arc;

use parking_lot::RwLock;
use shared::util::now_millis;
use shared::{
    CartLine, Notification, NotificationKind, Order, OrderDraft, OrderStatus, OrderType,
    PaymentStatus, Priority, StaffAssignment, Table,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::charges;
use crate::config::RateConfig;
use crate::error::{PosError, PosResult};
use crate::notify::{Correlation, Notifier};
use crate::sequence::SequenceAllocator;
use crate::store::PosStore;
use crate::tables::{self, TableEvent};

/// Everything about a submission that is not the cart contents.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub order_type: OrderType,
    /// Required for dine-in, ignored otherwise.
    pub table_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub staff: Option<StaffAssignment>,
    pub special_instructions: Option<String>,
}

/// How a submission ended.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The store accepted the order (freshly created or merged).
    Persisted { order: Order, merged: bool },
    /// The store was unreachable; the submission is queued for replay.
    /// Deferred success, not an error: the operator keeps serving.
    Queued {
        local_id: String,
        order_number: u64,
    },
}

pub struct OrderEngine {
    store: Arc<dyn PosStore>,
    sequence: Arc<SequenceAllocator>,
    notifier: Arc<Notifier>,
    rates: Arc<RwLock<RateConfig>>,
}

impl OrderEngine {
    pub fn new(
        store: Arc<dyn PosStore>,
        sequence: Arc<SequenceAllocator>,
        notifier: Arc<Notifier>,
        rates: Arc<RwLock<RateConfig>>,
    ) -> Self {
        Self {
            store,
            sequence,
            notifier,
            rates,
        }
    }

    /// Submit a cart snapshot. Returns the persisted order and whether it
    /// was merged into an existing one.
    pub async fn submit(&self, lines: &[CartLine], req: &SubmitRequest) -> PosResult<(Order, bool)> {
        charges::validate_lines(lines)?;
        if req.order_type == OrderType::DineIn && req.table_number.is_none() {
            return Err(PosError::Validation(
                "dine-in order requires a table number".into(),
            ));
        }

        let mut retried = false;
        loop {
            match self.try_submit(lines, req).await {
                Err(PosError::Conflict(msg)) if !retried => {
                    warn!(error = %msg, "submission conflicted, re-reading merge decision");
                    retried = true;
                }
                outcome => return outcome,
            }
        }
    }

    async fn try_submit(
        &self,
        lines: &[CartLine],
        req: &SubmitRequest,
    ) -> PosResult<(Order, bool)> {
        let dine_in_table = match req.order_type {
            OrderType::DineIn => req.table_number.clone(),
            _ => None,
        };

        let existing = match &dine_in_table {
            Some(table) => self.store.find_open_order_for_table(table).await?,
            None => None,
        };

        let (order, merged) = match existing {
            Some(existing) => (self.merge_into(existing, lines).await?, true),
            None => {
                // Validate the table before anything persists; a bad
                // number must not leave an orphaned open order behind.
                if let Some(table) = &dine_in_table {
                    self.store.get_table(table).await?;
                }
                (self.create(lines, req).await?, false)
            }
        };

        if let Some(table) = &dine_in_table {
            bind_table(self.store.as_ref(), table, &order.id).await?;
        }

        self.notify_submitted(&order, merged);
        Ok((order, merged))
    }

    /// Create path: new numbers, charges from scratch, status pending.
    async fn create(&self, lines: &[CartLine], req: &SubmitRequest) -> PosResult<Order> {
        let draft = self.build_draft(lines.to_vec(), req)?;
        let order_number = draft.order_number;
        let order = self
            .store
            .insert_order(draft, &Uuid::new_v4().to_string())
            .await?;
        info!(
            order_id = %order.id,
            order_number,
            order_type = %order.order_type,
            table = ?order.table_number,
            total = order.total,
            "order created"
        );
        Ok(order)
    }

    /// Merge path: bump matching lines by product reference, append the
    /// rest, add charge components, persist as an update.
    async fn merge_into(&self, mut existing: Order, lines: &[CartLine]) -> PosResult<Order> {
        let incoming = charges::compute(lines, *self.rates.read())?;

        for new_line in lines {
            match existing
                .items
                .iter_mut()
                .find(|l| l.product_id == new_line.product_id)
            {
                Some(line) => line.quantity += new_line.quantity,
                None => existing.items.push(new_line.clone()),
            }
        }

        let combined = charges::combine(
            charges::Charges {
                subtotal: existing.subtotal,
                service_charge: existing.service_charge,
                tax: existing.tax,
                total: existing.total,
            },
            incoming,
        )?;
        existing.subtotal = combined.subtotal;
        existing.service_charge = combined.service_charge;
        existing.tax = combined.tax;
        existing.total = combined.total;
        existing.updated_at = now_millis();

        let order = self.store.update_order(&existing).await?;
        info!(
            order_id = %order.id,
            table = ?order.table_number,
            line_count = order.items.len(),
            total = order.total,
            "order merged"
        );
        Ok(order)
    }

    /// Build a fully-priced draft for `lines`. Allocates the order and
    /// bill numbers from the local allocator, so this works offline too;
    /// the offline queue serializes exactly this draft.
    pub fn build_draft(&self, lines: Vec<CartLine>, req: &SubmitRequest) -> PosResult<OrderDraft> {
        let computed = charges::compute(&lines, *self.rates.read())?;
        let order_number = self.sequence.next_order_number()?;
        let now = now_millis();

        Ok(OrderDraft {
            order_number,
            bill_number: SequenceAllocator::bill_number(order_number),
            table_number: match req.order_type {
                OrderType::DineIn => req.table_number.clone(),
                _ => None,
            },
            order_type: req.order_type,
            items: lines,
            subtotal: computed.subtotal,
            service_charge: computed.service_charge,
            tax: computed.tax,
            total: computed.total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            customer_name: req.customer_name.clone(),
            customer_phone: req.customer_phone.clone(),
            customer_email: req.customer_email.clone(),
            staff: req.staff.clone(),
            special_instructions: req.special_instructions.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn notify_submitted(&self, order: &Order, merged: bool) -> Notification {
        let message = if merged {
            format!(
                "Order #{} updated for table {}",
                order.order_number,
                order.table_number.as_deref().unwrap_or("-")
            )
        } else {
            format!("Order created for {}", order.order_type)
        };
        self.notifier.emit(
            NotificationKind::Order,
            "New Order",
            message,
            Priority::Medium,
            Correlation::order(order.id.clone()),
        )
    }

    /// Persist a status bump and notify. `Ready` is announced at high
    /// priority so the floor staff see it.
    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> PosResult<Order> {
        let mut order = self.store.get_order(order_id).await?;
        order.status = status;
        order.updated_at = now_millis();
        let order = self.store.update_order(&order).await?;

        let priority = if status == OrderStatus::Ready {
            Priority::High
        } else {
            Priority::Medium
        };
        self.notifier.emit(
            NotificationKind::Order,
            "Order Status Updated",
            format!("Order #{} is now {}", order.order_number, status),
            priority,
            Correlation::order(order.id.clone()),
        );
        Ok(order)
    }

    /// Cancel an open order, recording the reason. A dine-in table the
    /// order was bound to goes to cleaning.
    pub async fn cancel(&self, order_id: &str, reason: &str) -> PosResult<Order> {
        let mut order = self.store.get_order(order_id).await?;
        if !order.status.is_open() {
            return Err(PosError::Validation(format!(
                "order {} is already {}",
                order.order_number, order.status
            )));
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = now_millis();
        order.special_instructions = Some(match order.special_instructions.take() {
            Some(existing) => format!("{existing}\nCancellation Reason: {reason}"),
            None => format!("Cancellation Reason: {reason}"),
        });
        let order = self.store.update_order(&order).await?;

        if order.order_type == OrderType::DineIn {
            if let Some(table_number) = &order.table_number {
                let mut table = self.store.get_table(table_number).await?;
                if table.current_order.as_deref() == Some(order_id) {
                    tables::apply(&mut table, TableEvent::SendForCleaning)?;
                    self.store.update_table(&table).await?;
                }
            }
        }

        self.notifier.emit(
            NotificationKind::Order,
            "Order Cancelled",
            format!("Order #{} cancelled: {reason}", order.order_number),
            Priority::High,
            Correlation::order(order.id.clone()),
        );
        Ok(order)
    }

    /// Capture a staff assignment on the order; the name is snapshotted
    /// at this moment.
    pub async fn assign_staff(
        &self,
        order_id: &str,
        staff: StaffAssignment,
    ) -> PosResult<Order> {
        let mut order = self.store.get_order(order_id).await?;
        order.staff = Some(staff);
        order.updated_at = now_millis();
        Ok(self.store.update_order(&order).await?)
    }
}

/// Drive `table_number` to occupied with `order_id` bound. Re-asserting an
/// existing binding is a no-op.
pub(crate) async fn bind_table(
    store: &dyn PosStore,
    table_number: &str,
    order_id: &str,
) -> PosResult<Table> {
    let mut table = store.get_table(table_number).await?;
    tables::apply(
        &mut table,
        TableEvent::OrderBound {
            order_id: order_id.to_string(),
        },
    )?;
    Ok(store.update_table(&table).await?)
}

#[cfg(test)]
mod tests;
