//! Error types for the batch ledger

use crate::types::{BatchId, FarmId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wire code: caller is not the required identity
pub const ERR_UNAUTHORIZED: u32 = 100;
/// Wire code: a field violates a bound or a semantic constraint
pub const ERR_INVALID_INPUT: u32 = 101;
/// Wire code: farm inactive at creation, or batch inactive at update
pub const ERR_INACTIVE_FARM: u32 = 102;
/// Wire code: administrative pause in effect
pub const ERR_PAUSED: u32 = 103;
/// Wire code: batch does not exist
pub const ERR_NOT_FOUND: u32 = 104;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller is not the batch owner / administrator
    #[error("Unauthorized caller")]
    Unauthorized,

    /// Field bound or semantic constraint violated
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced farm was not active in the farm directory
    #[error("Farm {0} is not active")]
    InactiveFarm(FarmId),

    /// Batch has been deactivated and no longer accepts updates
    #[error("Batch {0} is not active")]
    BatchInactive(BatchId),

    /// Batch creation is paused
    #[error("Ledger is paused")]
    Paused,

    /// Batch not found
    #[error("Batch not found: {0}")]
    BatchNotFound(BatchId),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Signature or hash-chain verification failed
    #[error("Signature verification failed: {0}")]
    Signature(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Numeric wire code for rule violations, `None` for infrastructure faults.
    ///
    /// `InactiveFarm` and `BatchInactive` share code 102.
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::Unauthorized => Some(ERR_UNAUTHORIZED),
            Error::InvalidInput(_) => Some(ERR_INVALID_INPUT),
            Error::InactiveFarm(_) | Error::BatchInactive(_) => Some(ERR_INACTIVE_FARM),
            Error::Paused => Some(ERR_PAUSED),
            Error::BatchNotFound(_) => Some(ERR_NOT_FOUND),
            _ => None,
        }
    }

    /// True when the error is a ledger rule violation rather than a fault
    pub fn is_domain(&self) -> bool {
        self.code().is_some()
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
