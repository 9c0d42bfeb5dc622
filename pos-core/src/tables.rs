//! Table State Machine.
//!
//! Every transition is explicit; there are no implicit defaults. The one
//! universal rule: entering `Available` from any state clears the order
//! reference, customer identity, reservation time and staff assignment,
//! so a table never leaks one guest's data to the next.

use shared::{Table, TableStatus};
use thiserror::Error;
use tracing::debug;

use shared::util::now_millis;

/// Events that drive a table between states. Order-lifecycle events and
/// explicit staff actions share this one vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    /// An order was persisted for this table.
    OrderBound { order_id: String },
    /// Staff reserved the table for a named guest.
    Reserve { customer_name: String, time: i64 },
    /// Guests left or the order was cancelled; the binding is released
    /// and the table needs cleaning.
    SendForCleaning,
    /// Bill settled; table is released.
    FinalizeBill,
    /// Cleaning finished.
    CleanComplete,
    /// Staff took the table out of service.
    MarkOutOfOrder,
    /// Staff returned the table to service.
    MarkFixed,
}

impl TableEvent {
    fn name(&self) -> &'static str {
        match self {
            TableEvent::OrderBound { .. } => "order-bound",
            TableEvent::Reserve { .. } => "reserve",
            TableEvent::SendForCleaning => "send-for-cleaning",
            TableEvent::FinalizeBill => "finalize-bill",
            TableEvent::CleanComplete => "clean-complete",
            TableEvent::MarkOutOfOrder => "mark-out-of-order",
            TableEvent::MarkFixed => "mark-fixed",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("table {number} cannot {event} while {status:?}")]
    Invalid {
        number: String,
        status: TableStatus,
        event: &'static str,
    },
    #[error("table {number} is occupied by order {current}")]
    OccupiedByOther { number: String, current: String },
}

/// Clear everything guest-related. Runs on every entry into `Available`,
/// regardless of the state we came from.
fn enter_available(table: &mut Table) {
    table.status = TableStatus::Available;
    table.current_order = None;
    table.customer_name = None;
    table.customer_phone = None;
    table.reservation_time = None;
    table.staff = None;
}

/// Apply `event` to `table`, mutating it in place.
pub fn apply(table: &mut Table, event: TableEvent) -> Result<(), TransitionError> {
    let from = table.status;
    match (from, &event) {
        (TableStatus::Available | TableStatus::Reserved, TableEvent::OrderBound { order_id }) => {
            table.status = TableStatus::Occupied;
            table.current_order = Some(order_id.clone());
        }
        // Rebinding the same order is a no-op (the merge path re-asserts
        // the binding); a different order is a hard error.
        (TableStatus::Occupied, TableEvent::OrderBound { order_id }) => {
            match table.current_order.as_deref() {
                Some(current) if current == order_id => {}
                Some(current) => {
                    return Err(TransitionError::OccupiedByOther {
                        number: table.number.clone(),
                        current: current.to_string(),
                    });
                }
                None => table.current_order = Some(order_id.clone()),
            }
        }
        (TableStatus::Available, TableEvent::Reserve { customer_name, time }) => {
            table.status = TableStatus::Reserved;
            table.customer_name = Some(customer_name.clone());
            table.reservation_time = Some(*time);
        }
        (TableStatus::Occupied, TableEvent::SendForCleaning) => {
            table.status = TableStatus::Cleaning;
            // A cleaning table holds no order slot; Occupied is the only
            // state that carries a binding.
            table.current_order = None;
        }
        (TableStatus::Occupied, TableEvent::FinalizeBill) => {
            enter_available(table);
        }
        // Finalizing an already-free table is a no-op, which keeps bill
        // finalization idempotent.
        (TableStatus::Available, TableEvent::FinalizeBill) => {}
        (TableStatus::Cleaning, TableEvent::CleanComplete) => {
            table.last_cleaned = Some(now_millis());
            enter_available(table);
        }
        (TableStatus::OutOfOrder, TableEvent::MarkFixed) => {
            enter_available(table);
        }
        (
            TableStatus::Available | TableStatus::Reserved | TableStatus::Cleaning,
            TableEvent::MarkOutOfOrder,
        ) => {
            table.status = TableStatus::OutOfOrder;
        }
        _ => {
            return Err(TransitionError::Invalid {
                number: table.number.clone(),
                status: from,
                event: event.name(),
            });
        }
    }
    debug!(table = %table.number, from = ?from, to = ?table.status, event = event.name(), "table transition");
    Ok(())
}

/// Staff-initiated "set to cleaning" override. Unlike the order-driven
/// flow this is legal from any state, and it must not touch order or
/// customer fields: from a non-occupied state none exist, and from an
/// occupied one the open order keeps its slot.
pub fn staff_set_cleaning(table: &mut Table) {
    debug!(table = %table.number, from = ?table.status, "staff set-to-cleaning");
    table.status = TableStatus::Cleaning;
}

/// `Occupied` iff an order reference is present.
pub fn invariant_holds(table: &Table) -> bool {
    (table.status == TableStatus::Occupied) == table.current_order.is_some()
}
