//! Main ledger orchestration layer
//!
//! This module ties together storage, the farm directory, and the actor into
//! a high-level async API for batch lifecycle operations.
//!
//! # Example
//!
//! ```no_run
//! use batch_ledger::{Config, InMemoryFarmDirectory, Ledger, NewBatch, Principal, FarmId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> batch_ledger::Result<()> {
//!     let directory = Arc::new(InMemoryFarmDirectory::with_active([FarmId(1)]));
//!     let ledger = Ledger::open(Config::default(), directory).await?;
//!
//!     let farmer = Principal::new("farmer");
//!     let batch_id = ledger
//!         .create_batch(
//!             &farmer,
//!             NewBatch {
//!                 farm_id: FarmId(1),
//!                 produce_type: "Apples".into(),
//!                 harvest_date: 1_700_000_000,
//!                 batch_hash: vec![0xAB; 32],
//!                 metadata: String::new(),
//!                 organic_practices: vec!["No pesticides".into()],
//!             },
//!         )
//!         .await?;
//!     println!("registered batch {}", batch_id);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    crypto::KeyPair,
    directory::FarmDirectory,
    events::EventRecord,
    metrics::Metrics,
    state::LedgerState,
    storage::{Storage, StorageStats},
    types::{
        AdminState, BatchId, BatchRecord, BatchUpdate, BatchVersion, NewBatch, OwnershipTransfer,
        Principal,
    },
    Config, Error, Result,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle for mutating operations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Live event channel
    events: broadcast::Sender<EventRecord>,

    /// Public key of the event signer, if signing
    signer: Option<[u8; 32]>,

    /// Metrics shared with the actor
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config, directory: Arc<dyn FarmDirectory>) -> Result<Self> {
        Self::start(config, directory, None).await
    }

    /// Open ledger that signs every event record
    pub async fn open_signed(
        config: Config,
        directory: Arc<dyn FarmDirectory>,
        keypair: KeyPair,
    ) -> Result<Self> {
        Self::start(config, directory, Some(keypair)).await
    }

    async fn start(
        config: Config,
        directory: Arc<dyn FarmDirectory>,
        keypair: Option<KeyPair>,
    ) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config)?);
        let (events, _) = broadcast::channel(config.event_channel_capacity);

        let mut state = LedgerState::load(storage.clone(), directory, config.administrator())?
            .with_event_channel(events.clone());

        let signer = keypair.as_ref().map(KeyPair::public_key);
        if let Some(keypair) = keypair {
            state = state.with_keypair(keypair);
        }

        let metrics = state.metrics().clone();
        let handle = spawn_ledger_actor(state, config.mailbox_capacity);

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            signing = signer.is_some(),
            "Ledger opened"
        );

        Ok(Self {
            handle,
            storage,
            events,
            signer,
            metrics,
            config,
        })
    }

    // Mutating operations

    /// Register a new batch owned by `caller`
    pub async fn create_batch(&self, caller: &Principal, request: NewBatch) -> Result<BatchId> {
        self.handle.create_batch(caller.clone(), request).await
    }

    /// Merge fields into a batch and record a version row
    pub async fn update_batch(
        &self,
        caller: &Principal,
        batch_id: BatchId,
        update: BatchUpdate,
    ) -> Result<()> {
        self.handle
            .update_batch(caller.clone(), batch_id, update)
            .await
    }

    /// Soft-delete a batch (owner only, terminal)
    pub async fn deactivate_batch(&self, caller: &Principal, batch_id: BatchId) -> Result<()> {
        self.handle.deactivate_batch(caller.clone(), batch_id).await
    }

    /// Hand a batch to a new owner
    pub async fn transfer_batch_ownership(
        &self,
        caller: &Principal,
        batch_id: BatchId,
        new_owner: Principal,
        transfer_id: u64,
    ) -> Result<()> {
        self.handle
            .transfer_batch_ownership(caller.clone(), batch_id, new_owner, transfer_id)
            .await
    }

    /// Block batch creation (administrator only)
    pub async fn pause(&self, caller: &Principal) -> Result<()> {
        self.handle.set_paused(caller.clone(), true).await
    }

    /// Resume batch creation (administrator only)
    pub async fn unpause(&self, caller: &Principal) -> Result<()> {
        self.handle.set_paused(caller.clone(), false).await
    }

    // Read accessors

    /// Get batch record
    pub fn get_batch(&self, batch_id: BatchId) -> Result<Option<BatchRecord>> {
        self.storage.get_batch(batch_id)
    }

    /// Get a version row
    pub fn get_batch_version(&self, batch_id: BatchId, version: u64) -> Result<Option<BatchVersion>> {
        self.storage.get_version(batch_id, version)
    }

    /// Get a transfer row
    pub fn get_ownership_transfer(
        &self,
        batch_id: BatchId,
        transfer_id: u64,
    ) -> Result<Option<OwnershipTransfer>> {
        self.storage.get_transfer(batch_id, transfer_id)
    }

    /// Active flag, `false` for unknown batches
    pub fn is_batch_active(&self, batch_id: BatchId) -> Result<bool> {
        Ok(self
            .get_batch(batch_id)?
            .map(|record| record.active)
            .unwrap_or(false))
    }

    /// Administrative owner
    pub fn contract_owner(&self) -> Result<Principal> {
        Ok(self.admin_state()?.administrator)
    }

    /// Pause flag
    pub fn is_paused(&self) -> Result<bool> {
        Ok(self.admin_state()?.paused)
    }

    /// Last allocated batch ID (0 before the first batch)
    pub fn batch_count(&self) -> Result<u64> {
        Ok(self.admin_state()?.batch_counter)
    }

    /// All version rows of a batch, ordered by version key
    pub fn batch_versions(&self, batch_id: BatchId) -> Result<Vec<(u64, BatchVersion)>> {
        self.storage.list_versions(batch_id)
    }

    /// All transfer rows of a batch, ordered by transfer key
    pub fn batch_transfers(&self, batch_id: BatchId) -> Result<Vec<(u64, OwnershipTransfer)>> {
        self.storage.list_transfers(batch_id)
    }

    /// Replay committed events starting at `sequence`
    pub fn events_since(&self, sequence: u64, limit: usize) -> Result<Vec<EventRecord>> {
        self.storage.events_from(sequence, limit)
    }

    /// Receive every event committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Public key that signs event records, if any
    pub fn signer_public_key(&self) -> Option<[u8; 32]> {
        self.signer
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger after queued operations complete
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }

    fn admin_state(&self) -> Result<AdminState> {
        self.storage
            .load_admin_state()?
            .ok_or_else(|| Error::Storage("ledger state not initialized".to_string()))
    }
}
