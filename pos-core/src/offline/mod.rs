//! Offline Queue & Sync Engine.
//!
//! - **queue**: redb-persisted FIFO of order submissions made while the
//!   store was unreachable (survives process death)
//! - **sync**: drains the queue when connectivity returns, strictly in
//!   enqueue order, with idempotent replay
//!
//! Connectivity is modeled as a watch channel; the sync worker reacts to
//! the offline→online **edge**, it never polls.

pub mod queue;
pub mod sync;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared connectivity flag. Cloneable handle over a watch channel: any
/// holder can flip it, the sync worker subscribes to edges.
#[derive(Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Flip the flag. Subscribers only wake on an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}
