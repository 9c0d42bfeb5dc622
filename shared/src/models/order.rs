//! Order model and lifecycle enums.

use serde::{Deserialize, Serialize};

use super::cart::CartLine;
use super::staff::StaffAssignment;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// An open order still occupies its table's one-open-order slot.
    pub fn is_open(self) -> bool {
        !matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Payment settlement status, tracked separately from kitchen progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Service type of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    #[default]
    DineIn,
    Takeaway,
    Delivery,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::DineIn => write!(f, "dine-in"),
            OrderType::Takeaway => write!(f, "takeaway"),
            OrderType::Delivery => write!(f, "delivery"),
        }
    }
}

/// A persisted order.
///
/// Charge invariant: `total = subtotal + service_charge + tax`, each field
/// rounded to 2 decimal places. Table invariant: at most one open order
/// (`status.is_open()`) exists per table number at any time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Storage record ID, assigned by the store on insert.
    pub id: String,
    /// Store-assigned revision, bumped on every successful update. An
    /// update carrying a stale revision is rejected as a conflict.
    #[serde(default)]
    pub revision: u64,
    /// Internal sequential order number.
    pub order_number: u64,
    /// Customer-facing sequential bill number. Unique, immutable once
    /// assigned.
    pub bill_number: String,
    /// Bound table number; absent for takeaway/delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    pub order_type: OrderType,
    /// Line snapshots copied from the cart at submit time.
    pub items: Vec<CartLine>,
    pub subtotal: f64,
    pub service_charge: f64,
    pub tax: f64,
    pub total: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Denormalized walk-in customer identity; not a foreign key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Assigned staff, with name snapshotted at assignment time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    /// Millisecond UTC timestamps.
    pub created_at: i64,
    pub updated_at: i64,
}

/// An order-creation request before the store has assigned a record ID.
///
/// This is what the merge engine persists on the create path and what the
/// offline queue serializes while the store is unreachable. Sequence
/// numbers are already allocated here: they come from the local allocator,
/// not the store, so a queued draft keeps the number the operator saw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDraft {
    pub order_number: u64,
    pub bill_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    pub order_type: OrderType,
    pub items: Vec<CartLine>,
    pub subtotal: f64,
    pub service_charge: f64,
    pub tax: f64,
    pub total: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OrderDraft {
    /// Materialize the draft into an `Order` under a store-assigned ID.
    pub fn into_order(self, id: impl Into<String>) -> Order {
        Order {
            id: id.into(),
            revision: 0,
            order_number: self.order_number,
            bill_number: self.bill_number,
            table_number: self.table_number,
            order_type: self.order_type,
            items: self.items,
            subtotal: self.subtotal,
            service_charge: self.service_charge,
            tax: self.tax,
            total: self.total,
            status: self.status,
            payment_status: self.payment_status,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email,
            staff: self.staff,
            special_instructions: self.special_instructions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
