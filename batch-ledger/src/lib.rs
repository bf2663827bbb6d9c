//! Organic Produce Batch Ledger
//!
//! Authoritative record of produce batches: their origin farm, handling
//! history and ownership chain.
//!
//! # Architecture
//!
//! - **Single Writer**: One actor task applies every mutating operation in order
//! - **Atomic Commits**: Each operation writes its rows and its event in one RocksDB batch
//! - **Append-only History**: Version and transfer rows are keyed, never deleted
//! - **Auditable Events**: Every state change emits a sequenced, hash-chained event
//!
//! # Invariants
//!
//! - Batch IDs start at 1 and increase by exactly 1 per successful creation
//! - A batch's farm was active in the farm directory when the batch was created
//! - Only the current owner mutates a batch; only the administrator pauses
//! - Deactivation is terminal
//! - Pausing blocks batch creation only

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod state;
pub mod storage;
pub mod types;
pub mod validation;

// Re-exports
pub use config::Config;
pub use directory::{FarmDirectory, InMemoryFarmDirectory};
pub use error::{Error, Result};
pub use events::{BatchEvent, EventRecord};
pub use ledger::Ledger;
pub use state::LedgerState;
pub use storage::Storage;
pub use types::{
    AdminState, BatchHash, BatchId, BatchRecord, BatchUpdate, BatchVersion, FarmId, NewBatch,
    OwnershipTransfer, Principal,
};
