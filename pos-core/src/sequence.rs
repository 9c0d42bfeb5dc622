//! Sequence Allocator.
//!
//! Issues strictly increasing order numbers and derives the customer-facing
//! bill number. The counter lives in the local redb database and the
//! read-increment-write happens inside a single write transaction, so
//! allocation is atomic: concurrent submissions serialize on the write
//! transaction and a crash cannot reissue a number already shown to a
//! customer.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;

/// Table for sequence counters: key = counter name, value = last issued.
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const ORDER_NUMBER_KEY: &str = "order_number";

/// Bill number prefix; the rest is the zero-padded order number.
const BILL_PREFIX: &str = "BILL-";

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
}

pub struct SequenceAllocator {
    db: Arc<Database>,
    /// Value issued on the very first allocation.
    start: u64,
}

impl SequenceAllocator {
    pub fn new(db: Arc<Database>, start: u64) -> Self {
        Self { db, start }
    }

    /// Allocate the next order number. Persisted before it is returned.
    pub fn next_order_number(&self) -> Result<u64, SequenceError> {
        let txn = self.db.begin_write()?;
        let next;
        {
            let mut table = txn.open_table(SEQUENCE_TABLE)?;
            let last = table.get(ORDER_NUMBER_KEY)?.map(|v| v.value());
            next = match last {
                Some(n) => n + 1,
                None => self.start,
            };
            table.insert(ORDER_NUMBER_KEY, next)?;
        }
        txn.commit()?;
        Ok(next)
    }

    /// Customer-facing bill number for an order number.
    pub fn bill_number(order_number: u64) -> String {
        format!("{BILL_PREFIX}{order_number:06}")
    }

    /// Last issued order number, if any. Read-only.
    pub fn last_issued(&self) -> Result<Option<u64>, SequenceError> {
        let txn = self.db.begin_read()?;
        match txn.open_table(SEQUENCE_TABLE) {
            Ok(table) => Ok(table.get(ORDER_NUMBER_KEY)?.map(|v| v.value())),
            // Table absent means nothing was ever issued
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
