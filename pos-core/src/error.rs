//! Unified error handling for the coordinator.
//!
//! The taxonomy mirrors how callers must react:
//! - `Validation`: rejected before any persistence attempt, no retry;
//! - `NotFound`: surfaced to the caller, no retry;
//! - `Unavailable`: order creation is routed to the offline queue, every
//!   other operation surfaces it immediately;
//! - `Conflict`: the merge decision is re-read and retried once, then
//!   surfaced.

use thiserror::Error;

use crate::offline::queue::QueueError;
use crate::sequence::SequenceError;
use crate::store::StoreError;
use crate::tables::TransitionError;

#[derive(Debug, Error)]
pub enum PosError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Store unreachable: {0}")]
    Unavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid table transition: {0}")]
    Table(#[from] TransitionError),

    #[error("Sequence allocation failed: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Offline queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for PosError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => PosError::NotFound(msg),
            StoreError::Conflict(msg) => PosError::Conflict(msg),
            StoreError::Unavailable(msg) => PosError::Unavailable(msg),
            StoreError::Validation(msg) => PosError::Validation(msg),
            StoreError::Internal(msg) => PosError::Internal(msg),
        }
    }
}

pub type PosResult<T> = Result<T, PosError>;
