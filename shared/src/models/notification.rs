//! Notification model.

use serde::{Deserialize, Serialize};

use crate::util::{now_millis, snowflake_id};

/// What part of the system a notification concerns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Order,
    Payment,
    Kitchen,
    Table,
    System,
    Staff,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// A UI-facing notification. Mutated only by flipping `is_read`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub is_read: bool,
    /// Millisecond UTC.
    pub created_at: i64,
    /// Correlation IDs for drill-down from the notification feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: format!("NOTIF-{}", snowflake_id()),
            kind,
            title: title.into(),
            message: message.into(),
            priority,
            is_read: false,
            created_at: now_millis(),
            order_id: None,
            table_number: None,
            staff_id: None,
        }
    }
}
