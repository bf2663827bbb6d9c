//! Core types for the batch ledger
//!
//! All persisted types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Keyed lookup (history rows live under composite keys, not in lists)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch identifier, allocated by the ledger (first batch = 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    /// Big-endian key bytes (preserves numeric order in RocksDB)
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Farm identifier, owned by the external farm directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FarmId(pub u64);

impl fmt::Display for FarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated identity invoking an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Create new principal
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 32-byte content digest of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchHash([u8; 32]);

impl BatchHash {
    /// Length of the canonical digest
    pub const LEN: usize = 32;

    /// Wrap raw digest bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Accept a caller-supplied buffer, `None` unless it is exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    /// SHA-256 digest of arbitrary batch content
    pub fn digest(content: &[u8]) -> Self {
        Self(crate::crypto::hash_bytes(content))
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Canonical batch record (one per batch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Batch ID
    pub batch_id: BatchId,

    /// Farm that produced the batch (active at creation time)
    pub farm_id: FarmId,

    /// Current owner, changed only by ownership transfer
    pub owner: Principal,

    /// Produce type (≤ 50 chars)
    pub produce_type: String,

    /// Harvest date, caller-supplied epoch value
    pub harvest_date: u64,

    /// Content digest
    pub batch_hash: BatchHash,

    /// Free-form metadata (≤ 500 chars)
    pub metadata: String,

    /// Organic practices (≤ 10 entries, each 1..=100 chars)
    pub organic_practices: Vec<String>,

    /// Created timestamp (ledger clock)
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp (ledger clock)
    pub last_updated_at: DateTime<Utc>,

    /// Soft-delete flag, starts true
    pub active: bool,
}

/// Version history row, keyed by `(batch_id, version)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchVersion {
    /// Hash recorded with this version
    pub updated_hash: BatchHash,

    /// Notes (≤ 200 chars)
    pub version_notes: String,

    /// When the row was written
    pub timestamp: DateTime<Utc>,
}

/// Ownership transfer row, keyed by `(batch_id, transfer_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransfer {
    /// Owner before the transfer
    pub old_owner: Principal,

    /// Owner after the transfer
    pub new_owner: Principal,

    /// When the transfer happened
    pub timestamp: DateTime<Utc>,
}

/// Input to `create_batch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatch {
    /// Farm producing the batch
    pub farm_id: FarmId,
    /// Produce type
    pub produce_type: String,
    /// Harvest date (epoch value)
    pub harvest_date: u64,
    /// Raw digest bytes, must be exactly 32 bytes
    pub batch_hash: Vec<u8>,
    /// Metadata
    pub metadata: String,
    /// Organic practices
    pub organic_practices: Vec<String>,
}

/// Input to `update_batch`; `None` fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdate {
    /// New produce type
    pub produce_type: Option<String>,
    /// New harvest date
    pub harvest_date: Option<u64>,
    /// New digest bytes
    pub batch_hash: Option<Vec<u8>>,
    /// New metadata
    pub metadata: Option<String>,
    /// New organic practices
    pub organic_practices: Option<Vec<String>>,
    /// Notes for the version row
    pub version_notes: String,
    /// Caller-chosen version key
    pub version: u64,
}

/// Process-wide administrative state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminState {
    /// Administrative owner, fixed at initialization
    pub administrator: Principal,

    /// Pause flag (blocks batch creation only)
    pub paused: bool,

    /// Last allocated batch ID (0 = none yet)
    pub batch_counter: u64,
}

impl AdminState {
    /// Fresh state for a new ledger
    pub fn new(administrator: Principal) -> Self {
        Self {
            administrator,
            paused: false,
            batch_counter: 0,
        }
    }
}

/// Digital signature (Ed25519)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature bytes (64 bytes)
    #[serde(with = "serde_bytes")]
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Verify signature
    pub fn verify(&self, message: &[u8], public_key: &[u8; 32]) -> bool {
        use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

        let signature = DalekSignature::from_bytes(&self.bytes);

        let verifying_key = match VerifyingKey::from_bytes(public_key) {
            Ok(key) => key,
            Err(_) => return false,
        };

        verifying_key.verify(message, &signature).is_ok()
    }
}
