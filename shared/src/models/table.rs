//! Dining table model.

use serde::{Deserialize, Serialize};

use super::staff::StaffAssignment;

/// Table occupancy status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    Cleaning,
    OutOfOrder,
}

/// Dining table entity.
///
/// Invariants, enforced by the table state machine in `pos-core`:
/// - `status == Occupied` if and only if `current_order` is set;
/// - entering `Available` clears `current_order`, customer identity,
///   reservation time and staff assignment, so a table never carries one
///   guest's data over to the next.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    /// Storage record ID.
    pub id: String,
    /// Human-readable table number ("T01"), unique across the floor.
    pub number: String,
    pub capacity: i32,
    pub status: TableStatus,
    /// ID of the current open order, present only while occupied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    /// Reservation time, millisecond UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffAssignment>,
    /// Last time the table finished cleaning, millisecond UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cleaned: Option<i64>,
}

impl Table {
    pub fn new(id: impl Into<String>, number: impl Into<String>, capacity: i32) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
            capacity,
            status: TableStatus::Available,
            current_order: None,
            customer_name: None,
            customer_phone: None,
            reservation_time: None,
            staff: None,
            last_cleaned: None,
        }
    }
}
