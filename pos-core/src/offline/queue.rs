//! Persistent queue of deferred order submissions.
//!
//! Entries are keyed by a monotonically increasing queue sequence so the
//! drain replays in exact enqueue order. Each entry carries an idempotency
//! token minted at enqueue time: if a replay's response is lost after the
//! write succeeded server-side, the next replay of the same token returns
//! the already-created order instead of writing a duplicate.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::util::now_millis;
use shared::OrderDraft;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Table for pending submissions: key = queue sequence, value =
/// JSON-serialized PendingSubmission.
const PENDING_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("pending_submissions");

/// A serialized order-creation request awaiting replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingSubmission {
    /// Placeholder ID handed to the caller as the deferred-success result.
    pub local_id: String,
    /// Token the store uses to de-duplicate replays.
    pub idempotency_key: String,
    /// Wall-clock time the entry was queued, millisecond UTC.
    pub queued_at: i64,
    pub draft: OrderDraft,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;

pub struct OfflineQueue {
    db: Arc<Database>,
}

impl OfflineQueue {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a draft. Mints the local placeholder id and idempotency
    /// token, persists before returning.
    pub fn enqueue(&self, draft: OrderDraft) -> QueueResult<PendingSubmission> {
        let entry = PendingSubmission {
            local_id: format!("local-{}", Uuid::new_v4()),
            idempotency_key: Uuid::new_v4().to_string(),
            queued_at: now_millis(),
            draft,
        };
        let bytes = serde_json::to_vec(&entry)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_TABLE)?;
            let next_seq = table.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);
            table.insert(next_seq, bytes.as_slice())?;
        }
        txn.commit()?;

        info!(
            local_id = %entry.local_id,
            order_number = entry.draft.order_number,
            "submission queued for offline replay"
        );
        Ok(entry)
    }

    /// Oldest entry, if any, with its queue sequence.
    pub fn front(&self) -> QueueResult<Option<(u64, PendingSubmission)>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(PENDING_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match table.first()? {
            Some((seq, bytes)) => {
                let entry: PendingSubmission = serde_json::from_slice(bytes.value())?;
                Ok(Some((seq.value(), entry)))
            }
            None => Ok(None),
        }
    }

    /// Remove an entry after confirmed replay.
    pub fn remove(&self, seq: u64) -> QueueResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_TABLE)?;
            table.remove(seq)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Operator purge by placeholder id. Returns whether anything was
    /// removed.
    pub fn purge(&self, local_id: &str) -> QueueResult<bool> {
        let target = {
            let txn = self.db.begin_read()?;
            let table = match txn.open_table(PENDING_TABLE) {
                Ok(table) => table,
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            let mut found = None;
            for item in table.iter()? {
                let (seq, bytes) = item?;
                let entry: PendingSubmission = serde_json::from_slice(bytes.value())?;
                if entry.local_id == local_id {
                    found = Some(seq.value());
                    break;
                }
            }
            found
        };
        match target {
            Some(seq) => {
                self.remove(seq)?;
                info!(local_id, "pending submission purged by operator");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// All entries in enqueue order.
    pub fn entries(&self) -> QueueResult<Vec<PendingSubmission>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(PENDING_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_, bytes) = item?;
            entries.push(serde_json::from_slice(bytes.value())?);
        }
        Ok(entries)
    }

    pub fn len(&self) -> QueueResult<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.front()?.is_none())
    }
}
