//! Staff assignment snapshot.

use serde::{Deserialize, Serialize};

/// Reference to a staff member plus the name captured at assignment time.
///
/// The name is a snapshot, not a live join: the label on an order or table
/// survives later renames and staff record deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffAssignment {
    pub staff_id: String,
    pub snapshot_name: String,
}

impl StaffAssignment {
    pub fn new(staff_id: impl Into<String>, snapshot_name: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            snapshot_name: snapshot_name.into(),
        }
    }
}
