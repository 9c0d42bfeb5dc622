//! Shared data model for the POS core.
//!
//! Plain serde types consumed by `pos-core` and by external collaborators
//! (storage, UI, kitchen display). No business logic lives here beyond
//! small derived predicates on the status enums.

pub mod models;
pub mod util;

pub use models::cart::CartLine;
pub use models::notification::{Notification, NotificationKind, Priority};
pub use models::order::{Order, OrderDraft, OrderStatus, OrderType, PaymentStatus};
pub use models::staff::StaffAssignment;
pub use models::table::{Table, TableStatus};
