//! Notification Dispatcher.
//!
//! Typed, prioritized events on status changes, for consumption by
//! displays and alert surfaces. A capped in-memory feed plus a broadcast
//! channel for live subscribers. A UI convenience layer, not a durable
//! event log.

use std::collections::VecDeque;

use parking_lot::Mutex;
use shared::{Notification, NotificationKind, Priority};
use tokio::sync::broadcast;
use tracing::debug;

/// Correlation IDs attached to an emitted notification.
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    pub order_id: Option<String>,
    pub table_number: Option<String>,
    pub staff_id: Option<String>,
}

impl Correlation {
    pub fn order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn table(table_number: impl Into<String>) -> Self {
        Self {
            table_number: Some(table_number.into()),
            ..Self::default()
        }
    }
}

pub struct Notifier {
    feed: Mutex<VecDeque<Notification>>,
    tx: broadcast::Sender<Notification>,
    cap: usize,
}

impl Notifier {
    pub fn new(cap: usize) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            feed: Mutex::new(VecDeque::new()),
            tx,
            cap,
        }
    }

    /// Create, store and broadcast a notification. The feed keeps the
    /// newest `cap` entries; the oldest are dropped.
    pub fn emit(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
        correlation: Correlation,
    ) -> Notification {
        let mut notification = Notification::new(kind, title, message, priority);
        notification.order_id = correlation.order_id;
        notification.table_number = correlation.table_number;
        notification.staff_id = correlation.staff_id;

        debug!(
            id = %notification.id,
            kind = ?notification.kind,
            priority = ?notification.priority,
            "notification emitted"
        );

        {
            let mut feed = self.feed.lock();
            feed.push_front(notification.clone());
            feed.truncate(self.cap);
        }
        // No receivers is fine; the feed is the source of truth.
        let _ = self.tx.send(notification.clone());
        notification
    }

    /// Flip the read flag. Returns false when the id is unknown (already
    /// trimmed, perhaps). Never deletes.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut feed = self.feed.lock();
        match feed.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&self) {
        self.feed.lock().clear();
    }

    /// Newest-first snapshot of the feed.
    pub fn list(&self) -> Vec<Notification> {
        self.feed.lock().iter().cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.feed.lock().iter().filter(|n| !n.is_read).count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}
