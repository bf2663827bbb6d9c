//! Farm directory capability
//!
//! The ledger never owns farm records. It asks a directory whether a farm is
//! active, once per `create_batch`, and never caches the answer.

use crate::types::FarmId;
use dashmap::DashMap;

/// Read-only view of the external farm registry
pub trait FarmDirectory: Send + Sync {
    /// Whether the farm is currently active.
    ///
    /// Unknown farms and lookup failures must report `false`.
    fn is_farm_active(&self, farm_id: FarmId) -> bool;
}

/// In-process farm directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryFarmDirectory {
    farms: DashMap<FarmId, bool>,
}

impl InMemoryFarmDirectory {
    /// Create empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory where every listed farm is active
    pub fn with_active(farm_ids: impl IntoIterator<Item = FarmId>) -> Self {
        let directory = Self::new();
        for farm_id in farm_ids {
            directory.set_active(farm_id, true);
        }
        directory
    }

    /// Register or update a farm's status
    pub fn set_active(&self, farm_id: FarmId, active: bool) {
        self.farms.insert(farm_id, active);
    }

    /// Number of registered farms
    pub fn len(&self) -> usize {
        self.farms.len()
    }

    /// True if no farm is registered
    pub fn is_empty(&self) -> bool {
        self.farms.is_empty()
    }
}

impl FarmDirectory for InMemoryFarmDirectory {
    fn is_farm_active(&self, farm_id: FarmId) -> bool {
        self.farms.get(&farm_id).map(|entry| *entry).unwrap_or(false)
    }
}
