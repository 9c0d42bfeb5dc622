//! Storage collaborator seam.
//!
//! The core never talks to a concrete database; everything goes through
//! [`PosStore`]. The production implementation is an external collaborator
//! (a document store reached over the network); [`memory::MemoryStore`]
//! is the in-process reference used by tests and the offline drills.

pub mod memory;

use async_trait::async_trait;
use shared::{Order, OrderDraft, OrderStatus, Table};
use thiserror::Error;

/// Store error taxonomy. The coordinator reacts per variant: `Unavailable`
/// routes order creation to the offline queue, `Conflict` triggers one
/// re-read of the merge decision, the rest surface unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unreachable: {0}")]
    Unavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD surface the core consumes from the storage collaborator.
///
/// `insert_order` is the enforcement point for the one-open-order-per-table
/// invariant: it must atomically reject a dine-in draft whose table already
/// has an open order (`Conflict`). `idempotency_key` makes replays safe:
/// a key the store has already processed returns the previously created
/// order instead of writing a duplicate.
#[async_trait]
pub trait PosStore: Send + Sync {
    async fn insert_order(&self, draft: OrderDraft, idempotency_key: &str) -> StoreResult<Order>;

    /// Conditional write: applied only when `order.revision` matches the
    /// stored record (compare-and-swap), otherwise `Conflict`. The
    /// returned record carries the bumped revision, so concurrent
    /// read-modify-write cycles cannot silently overwrite each other.
    async fn update_order(&self, order: &Order) -> StoreResult<Order>;

    async fn get_order(&self, order_id: &str) -> StoreResult<Order>;

    /// The merge engine's lookup: open order (status not completed or
    /// cancelled) currently bound to `table_number`, if any.
    async fn find_open_order_for_table(&self, table_number: &str) -> StoreResult<Option<Order>>;

    async fn orders_with_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>>;

    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    async fn get_table(&self, table_number: &str) -> StoreResult<Table>;

    async fn update_table(&self, table: &Table) -> StoreResult<Table>;

    async fn list_tables(&self) -> StoreResult<Vec<Table>>;
}
