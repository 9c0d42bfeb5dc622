//! Order & Table Lifecycle Coordinator
//!
//! The core of the POS: turns an in-progress cart into a persisted order,
//! reconciles it against whatever is already happening at the table, drives
//! the table through its occupancy states, buffers submissions made while
//! the store is unreachable, and notifies interested parties.
//!
//! # Architecture
//!
//! ```text
//! UI events → Cart ─submit→ OrderEngine ──→ PosStore (external)
//!                               │  │
//!              SequenceAllocator┘  └─→ table state machine
//!                               │
//!                          Notifier ──→ subscribers (displays, alerts)
//!
//! store unreachable → OfflineQueue (redb) ─connectivity edge→ SyncEngine
//! ```
//!
//! CRUD over products/staff/customers/recipes is *not* here; the store is
//! an external collaborator reached through the [`store::PosStore`] trait.

pub mod billing;
pub mod cart;
pub mod charges;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod offline;
pub mod orders;
pub mod sequence;
pub mod store;
pub mod tables;

// Re-exports
pub use billing::{Billing, FinalizeOutcome};
pub use cart::Cart;
pub use charges::Charges;
pub use config::{PosConfig, RateConfig};
pub use coordinator::PosCoordinator;
pub use error::{PosError, PosResult};
pub use notify::{Correlation, Notifier};
pub use offline::queue::{OfflineQueue, PendingSubmission};
pub use offline::sync::{DrainHalt, DrainReport, SyncEngine, SyncWorker};
pub use offline::Connectivity;
pub use orders::{OrderEngine, SubmitOutcome, SubmitRequest};
pub use sequence::SequenceAllocator;
pub use store::{memory::MemoryStore, PosStore, StoreError, StoreResult};
