//! Queue drain on reconnect.
//!
//! `SyncEngine::drain` replays pending submissions strictly in enqueue
//! order. A replay that fails stops the drain (remaining entries stay
//! queued) and the reason is reported, never silently dropped. Replays
//! rejected with validation or conflict errors indicate a logic problem,
//! not transient unavailability, so they are surfaced to the operator at
//! urgent priority and left in the queue for an explicit purge decision.

use std::sync::Arc;

use shared::{NotificationKind, Priority};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::PosResult;
use crate::notify::{Correlation, Notifier};
use crate::offline::queue::OfflineQueue;
use crate::offline::Connectivity;
use crate::orders;
use crate::store::{PosStore, StoreError};

/// Why a drain stopped before the queue emptied.
#[derive(Debug, Clone, PartialEq)]
pub enum DrainHalt {
    /// Store went unreachable again; entries stay queued for the next
    /// connectivity edge.
    Unavailable(String),
    /// Replay was rejected; needs an operator decision (purge or fix).
    Rejected { local_id: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    pub replayed: usize,
    pub halt: Option<DrainHalt>,
}

pub struct SyncEngine {
    queue: Arc<OfflineQueue>,
    store: Arc<dyn PosStore>,
    notifier: Arc<Notifier>,
    /// Only one drain may run at a time.
    drain_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(queue: Arc<OfflineQueue>, store: Arc<dyn PosStore>, notifier: Arc<Notifier>) -> Self {
        Self {
            queue,
            store,
            notifier,
            drain_lock: Mutex::new(()),
        }
    }

    /// Replay queued submissions until the queue empties or a replay
    /// fails. Mutually exclusive with itself.
    pub async fn drain(&self) -> PosResult<DrainReport> {
        let _guard = self.drain_lock.lock().await;
        let mut report = DrainReport::default();

        while let Some((seq, entry)) = self.queue.front()? {
            match self
                .store
                .insert_order(entry.draft.clone(), &entry.idempotency_key)
                .await
            {
                Ok(order) => {
                    // Bind the table the draft asked for. If the floor
                    // moved on while we were offline, record it and leave
                    // the order unbound rather than clobbering the table.
                    if let Some(table_number) = &order.table_number {
                        if let Err(e) =
                            orders::bind_table(self.store.as_ref(), table_number, &order.id).await
                        {
                            warn!(
                                order_id = %order.id,
                                table = %table_number,
                                error = %e,
                                "replayed order could not re-occupy its table"
                            );
                        }
                    }
                    self.queue.remove(seq)?;
                    report.replayed += 1;
                    info!(
                        local_id = %entry.local_id,
                        order_id = %order.id,
                        order_number = order.order_number,
                        "queued submission replayed"
                    );
                    self.notifier.emit(
                        NotificationKind::System,
                        "Offline Order Synced",
                        format!("Order #{} synced to the store", order.order_number),
                        Priority::Low,
                        Correlation::order(order.id.clone()),
                    );
                }
                Err(StoreError::Unavailable(msg)) => {
                    warn!(error = %msg, remaining = self.queue.len()?, "drain halted, store unreachable");
                    report.halt = Some(DrainHalt::Unavailable(msg));
                    break;
                }
                Err(e @ (StoreError::Validation(_) | StoreError::Conflict(_))) => {
                    let reason = e.to_string();
                    error!(
                        local_id = %entry.local_id,
                        error = %reason,
                        "queued submission rejected, operator attention required"
                    );
                    self.notifier.emit(
                        NotificationKind::System,
                        "Offline Order Rejected",
                        format!(
                            "Queued order #{} was rejected: {reason}. Review and purge.",
                            entry.draft.order_number
                        ),
                        Priority::Urgent,
                        Correlation::default(),
                    );
                    report.halt = Some(DrainHalt::Rejected {
                        local_id: entry.local_id.clone(),
                        reason,
                    });
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }
}

/// Background worker that drains the queue on every offline→online edge.
pub struct SyncWorker {
    engine: Arc<SyncEngine>,
    connectivity: Connectivity,
    shutdown: CancellationToken,
}

impl SyncWorker {
    pub fn new(engine: Arc<SyncEngine>, connectivity: Connectivity, shutdown: CancellationToken) -> Self {
        Self {
            engine,
            connectivity,
            shutdown,
        }
    }

    pub async fn run(self) {
        info!("SyncWorker started");
        let mut rx = self.connectivity.subscribe();

        // Catch up on anything queued before the worker started.
        if self.connectivity.is_online() {
            self.drain_and_log().await;
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("SyncWorker shutting down");
                    break;
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Connectivity handle dropped; nothing left to watch.
                        break;
                    }
                    let online = *rx.borrow_and_update();
                    if online {
                        self.drain_and_log().await;
                    }
                }
            }
        }
        info!("SyncWorker stopped");
    }

    async fn drain_and_log(&self) {
        match self.engine.drain().await {
            Ok(report) => {
                if report.replayed > 0 || report.halt.is_some() {
                    info!(replayed = report.replayed, halt = ?report.halt, "drain finished");
                }
            }
            Err(e) => error!(error = %e, "drain failed"),
        }
    }
}
