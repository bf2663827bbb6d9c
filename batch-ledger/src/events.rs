//! Outbound ledger events
//!
//! Every successful mutating call produces exactly one [`BatchEvent`],
//! wrapped in a sequenced, hash-chained [`EventRecord`]. The record is
//! committed in the same write batch as the state change it describes, so a
//! failed call never leaves an event behind.

use crate::{
    crypto::{hash_bytes, KeyPair},
    types::{BatchId, FarmId, Principal, Signature},
    Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hash the first record chains from
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// State change notification for external indexers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchEvent {
    /// New batch registered
    BatchCreated {
        /// Batch ID
        batch_id: BatchId,
        /// Producing farm
        farm_id: FarmId,
        /// Initial owner
        owner: Principal,
    },

    /// Batch fields updated and a version row written
    BatchUpdated {
        /// Batch ID
        batch_id: BatchId,
        /// Caller-chosen version key
        version: u64,
        /// Owner performing the update
        owner: Principal,
    },

    /// Batch soft-deleted
    BatchDeactivated {
        /// Batch ID
        batch_id: BatchId,
        /// Owner performing the deactivation
        owner: Principal,
    },

    /// Batch ownership moved
    BatchTransferred {
        /// Batch ID
        batch_id: BatchId,
        /// Previous owner
        old_owner: Principal,
        /// New owner
        new_owner: Principal,
    },

    /// Batch creation paused
    ContractPaused {
        /// Administrator
        caller: Principal,
    },

    /// Batch creation resumed
    ContractUnpaused {
        /// Administrator
        caller: Principal,
    },
}

impl BatchEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            BatchEvent::BatchCreated { .. } => "batch-created",
            BatchEvent::BatchUpdated { .. } => "batch-updated",
            BatchEvent::BatchDeactivated { .. } => "batch-deactivated",
            BatchEvent::BatchTransferred { .. } => "batch-transferred",
            BatchEvent::ContractPaused { .. } => "contract-paused",
            BatchEvent::ContractUnpaused { .. } => "contract-unpaused",
        }
    }

    /// Batch this event refers to, if any
    pub fn batch_id(&self) -> Option<BatchId> {
        match self {
            BatchEvent::BatchCreated { batch_id, .. }
            | BatchEvent::BatchUpdated { batch_id, .. }
            | BatchEvent::BatchDeactivated { batch_id, .. }
            | BatchEvent::BatchTransferred { batch_id, .. } => Some(*batch_id),
            BatchEvent::ContractPaused { .. } | BatchEvent::ContractUnpaused { .. } => None,
        }
    }
}

/// Persisted event envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the event log (first = 1)
    pub sequence: u64,

    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Ledger clock at emission
    pub recorded_at: DateTime<Utc>,

    /// The event itself
    pub event: BatchEvent,

    /// Hash of the preceding record
    pub previous_hash: [u8; 32],

    /// Hash of this record's canonical bytes
    pub hash: [u8; 32],

    /// Ed25519 signature over `hash`, when the ledger signs
    pub signature: Option<Signature>,
}

impl EventRecord {
    /// Build the next record in the chain
    pub fn seal(
        sequence: u64,
        event: BatchEvent,
        recorded_at: DateTime<Utc>,
        previous_hash: [u8; 32],
        keypair: Option<&KeyPair>,
    ) -> Result<Self> {
        let mut record = Self {
            sequence,
            event_id: Uuid::now_v7(),
            recorded_at,
            event,
            previous_hash,
            hash: [0u8; 32],
            signature: None,
        };

        record.hash = record.compute_hash()?;
        record.signature = keypair.map(|keypair| keypair.sign(&record.hash));

        Ok(record)
    }

    /// Deterministic bytes covered by `hash`
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let bytes = bincode::serialize(&(
            self.sequence,
            self.event_id,
            &self.recorded_at,
            &self.event,
            self.previous_hash,
        ))?;
        Ok(bytes)
    }

    /// Recompute the record hash
    pub fn compute_hash(&self) -> Result<[u8; 32]> {
        Ok(hash_bytes(&self.canonical_bytes()?))
    }

    /// JSON form for indexers and logs
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> BatchEvent {
        BatchEvent::BatchCreated {
            batch_id: BatchId(1),
            farm_id: FarmId(1),
            owner: Principal::new("farmer"),
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(created().name(), "batch-created");
        let paused = BatchEvent::ContractPaused {
            caller: Principal::new("admin"),
        };
        assert_eq!(paused.name(), "contract-paused");
        assert_eq!(paused.batch_id(), None);
    }

    #[test]
    fn test_seal_links_previous_hash() {
        let first = EventRecord::seal(1, created(), Utc::now(), GENESIS_HASH, None).unwrap();
        let second = EventRecord::seal(2, created(), Utc::now(), first.hash, None).unwrap();

        assert_eq!(second.previous_hash, first.hash);
        assert_eq!(first.compute_hash().unwrap(), first.hash);
        assert!(first.signature.is_none());
    }

    #[test]
    fn test_seal_signs_when_keypair_present() {
        let keypair = KeyPair::generate();
        let record =
            EventRecord::seal(1, created(), Utc::now(), GENESIS_HASH, Some(&keypair)).unwrap();

        let signature = record.signature.as_ref().unwrap();
        assert!(signature.verify(&record.hash, &keypair.public_key()));
    }

    #[test]
    fn test_json_uses_wire_names() {
        let record = EventRecord::seal(1, created(), Utc::now(), GENESIS_HASH, None).unwrap();
        let json = record.to_json().unwrap();
        assert!(json.contains("batch-created"));
    }
}
