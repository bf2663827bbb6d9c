//! Single-writer ledger engine
//!
//! [`LedgerState`] executes every mutating operation synchronously:
//! validate, consult the farm directory (creation only), build a
//! [`ChangeSet`], commit it atomically, then publish the event. Checks run
//! before any write, so a rejected call leaves storage untouched.
//!
//! The engine assumes it is the only writer. [`crate::actor`] provides that
//! guarantee when the ledger is shared across tasks.

use crate::{
    crypto::KeyPair,
    directory::FarmDirectory,
    events::{BatchEvent, EventRecord},
    metrics::Metrics,
    storage::{ChangeSet, EventHead, Storage},
    types::{
        AdminState, BatchId, BatchRecord, BatchUpdate, BatchVersion, NewBatch, OwnershipTransfer,
        Principal,
    },
    validation, Error, Result,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// Default capacity of the live event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Authoritative ledger state and the operations that mutate it
pub struct LedgerState {
    storage: Arc<Storage>,
    directory: Arc<dyn FarmDirectory>,
    keypair: Option<KeyPair>,
    admin: AdminState,
    head: EventHead,
    metrics: Metrics,
    events: broadcast::Sender<EventRecord>,
}

impl fmt::Debug for LedgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerState")
            .field("admin", &self.admin)
            .field("head", &self.head)
            .field("signing", &self.keypair.is_some())
            .finish_non_exhaustive()
    }
}

impl LedgerState {
    /// Load state from storage, initializing a fresh database.
    ///
    /// The administrator is only recorded on first open; an existing ledger
    /// keeps its stored administrator.
    pub fn load(
        storage: Arc<Storage>,
        directory: Arc<dyn FarmDirectory>,
        administrator: Principal,
    ) -> Result<Self> {
        let admin = match storage.load_admin_state()? {
            Some(admin) => {
                if admin.administrator != administrator {
                    tracing::warn!(
                        stored = %admin.administrator,
                        configured = %administrator,
                        "Administrator is fixed at initialization, ignoring configured value"
                    );
                }
                admin
            }
            None => {
                let admin = AdminState::new(administrator);
                storage.initialize_admin_state(&admin)?;
                admin
            }
        };

        let head = storage.load_event_head()?;
        let metrics = Metrics::new().map_err(|e| Error::Other(e.to_string()))?;
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            administrator = %admin.administrator,
            paused = admin.paused,
            batch_counter = admin.batch_counter,
            event_sequence = head.sequence,
            "Ledger state loaded"
        );

        Ok(Self {
            storage,
            directory,
            keypair: None,
            admin,
            head,
            metrics,
            events,
        })
    }

    /// Sign every event record with this key pair
    pub fn with_keypair(mut self, keypair: KeyPair) -> Self {
        self.keypair = Some(keypair);
        self
    }

    /// Publish events on an existing broadcast channel
    pub fn with_event_channel(mut self, events: broadcast::Sender<EventRecord>) -> Self {
        self.events = events;
        self
    }

    /// Receive every event committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Operations

    /// Register a new batch owned by `caller`
    pub fn create_batch(&mut self, caller: &Principal, request: NewBatch) -> Result<BatchId> {
        self.instrument("create_batch", |state| state.apply_create(caller, request))
    }

    /// Merge the supplied fields into a batch and write a version row
    pub fn update_batch(
        &mut self,
        caller: &Principal,
        batch_id: BatchId,
        update: BatchUpdate,
    ) -> Result<()> {
        self.instrument("update_batch", |state| {
            state.apply_update(caller, batch_id, update)
        })
    }

    /// Soft-delete a batch
    pub fn deactivate_batch(&mut self, caller: &Principal, batch_id: BatchId) -> Result<()> {
        self.instrument("deactivate_batch", |state| {
            state.apply_deactivate(caller, batch_id)
        })
    }

    /// Hand a batch to a new owner and write a transfer row
    pub fn transfer_batch_ownership(
        &mut self,
        caller: &Principal,
        batch_id: BatchId,
        new_owner: Principal,
        transfer_id: u64,
    ) -> Result<()> {
        self.instrument("transfer_batch_ownership", |state| {
            state.apply_transfer(caller, batch_id, new_owner, transfer_id)
        })
    }

    /// Block batch creation (administrator only)
    pub fn pause(&mut self, caller: &Principal) -> Result<()> {
        self.instrument("pause", |state| state.apply_pause(caller, true))
    }

    /// Resume batch creation (administrator only)
    pub fn unpause(&mut self, caller: &Principal) -> Result<()> {
        self.instrument("unpause", |state| state.apply_pause(caller, false))
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
            .storage
            .get_batch(batch_id)?
            .map(|record| record.active)
            .unwrap_or(false))
    }

    /// Administrative owner
    pub fn contract_owner(&self) -> &Principal {
        &self.admin.administrator
    }

    /// Pause flag
    pub fn is_paused(&self) -> bool {
        self.admin.paused
    }

    /// Last allocated batch ID (0 before the first batch)
    pub fn batch_count(&self) -> u64 {
        self.admin.batch_counter
    }

    /// Sequence of the last committed event
    pub fn event_sequence(&self) -> u64 {
        self.head.sequence
    }

    // Internals

    fn instrument<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        let result = op(self);
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(_) => self.metrics.record_operation(operation, "ok", elapsed),
            Err(e) => match e.code() {
                Some(code) => {
                    tracing::warn!(operation, code, error = %e, "Operation rejected");
                    self.metrics
                        .record_operation(operation, &code.to_string(), elapsed);
                }
                None => {
                    tracing::error!(operation, error = %e, "Operation failed");
                    self.metrics.record_operation(operation, "fault", elapsed);
                }
            },
        }

        result
    }

    fn apply_create(&mut self, caller: &Principal, request: NewBatch) -> Result<BatchId> {
        if self.admin.paused {
            return Err(Error::Paused);
        }

        if !self.directory.is_farm_active(request.farm_id) {
            return Err(Error::InactiveFarm(request.farm_id));
        }

        let batch_hash = validation::validate_new_batch(&request)?;

        let next = self
            .admin
            .batch_counter
            .checked_add(1)
            .ok_or_else(|| Error::Other("batch counter exhausted".to_string()))?;
        let batch_id = BatchId(next);
        let now = Utc::now();

        let record = BatchRecord {
            batch_id,
            farm_id: request.farm_id,
            owner: caller.clone(),
            produce_type: request.produce_type,
            harvest_date: request.harvest_date,
            batch_hash,
            metadata: request.metadata,
            organic_practices: request.organic_practices,
            created_at: now,
            last_updated_at: now,
            active: true,
        };

        let mut admin = self.admin.clone();
        admin.batch_counter = next;

        let event = BatchEvent::BatchCreated {
            batch_id,
            farm_id: record.farm_id,
            owner: caller.clone(),
        };
        let mut changes = self.prepare(event, now)?;
        changes.admin = Some(admin.clone());
        changes.batch = Some(record);

        self.commit(changes)?;
        self.admin = admin;
        self.metrics.record_batch_created();

        Ok(batch_id)
    }

    fn apply_update(
        &mut self,
        caller: &Principal,
        batch_id: BatchId,
        update: BatchUpdate,
    ) -> Result<()> {
        let mut record = self.owned_batch(caller, batch_id)?;

        if !record.active {
            return Err(Error::BatchInactive(batch_id));
        }

        let new_hash = validation::validate_update(&update)?;
        let now = Utc::now();

        if let Some(produce_type) = update.produce_type {
            record.produce_type = produce_type;
        }
        if let Some(harvest_date) = update.harvest_date {
            record.harvest_date = harvest_date;
        }
        if let Some(hash) = new_hash {
            record.batch_hash = hash;
        }
        if let Some(metadata) = update.metadata {
            record.metadata = metadata;
        }
        if let Some(practices) = update.organic_practices {
            record.organic_practices = practices;
        }
        record.last_updated_at = now;

        let row = BatchVersion {
            updated_hash: record.batch_hash,
            version_notes: update.version_notes,
            timestamp: now,
        };

        let event = BatchEvent::BatchUpdated {
            batch_id,
            version: update.version,
            owner: caller.clone(),
        };
        let mut changes = self.prepare(event, now)?;
        changes.batch = Some(record);
        changes.version = Some((batch_id, update.version, row));

        self.commit(changes)
    }

    fn apply_deactivate(&mut self, caller: &Principal, batch_id: BatchId) -> Result<()> {
        let mut record = self.owned_batch(caller, batch_id)?;
        record.active = false;

        let event = BatchEvent::BatchDeactivated {
            batch_id,
            owner: caller.clone(),
        };
        let mut changes = self.prepare(event, Utc::now())?;
        changes.batch = Some(record);

        self.commit(changes)
    }

    fn apply_transfer(
        &mut self,
        caller: &Principal,
        batch_id: BatchId,
        new_owner: Principal,
        transfer_id: u64,
    ) -> Result<()> {
        let mut record = self.owned_batch(caller, batch_id)?;

        if new_owner == *caller {
            return Err(Error::InvalidInput(
                "new owner must differ from current owner".to_string(),
            ));
        }

        let now = Utc::now();
        let old_owner = std::mem::replace(&mut record.owner, new_owner.clone());
        record.last_updated_at = now;

        let row = OwnershipTransfer {
            old_owner: old_owner.clone(),
            new_owner: new_owner.clone(),
            timestamp: now,
        };

        let event = BatchEvent::BatchTransferred {
            batch_id,
            old_owner,
            new_owner,
        };
        let mut changes = self.prepare(event, now)?;
        changes.batch = Some(record);
        changes.transfer = Some((batch_id, transfer_id, row));

        self.commit(changes)
    }

    fn apply_pause(&mut self, caller: &Principal, paused: bool) -> Result<()> {
        if *caller != self.admin.administrator {
            return Err(Error::Unauthorized);
        }

        let mut admin = self.admin.clone();
        admin.paused = paused;

        let event = if paused {
            BatchEvent::ContractPaused {
                caller: caller.clone(),
            }
        } else {
            BatchEvent::ContractUnpaused {
                caller: caller.clone(),
            }
        };
        let mut changes = self.prepare(event, Utc::now())?;
        changes.admin = Some(admin.clone());

        self.commit(changes)?;
        self.admin = admin;

        Ok(())
    }

    /// Load a batch and require `caller` to own it
    fn owned_batch(&self, caller: &Principal, batch_id: BatchId) -> Result<BatchRecord> {
        let record = self
            .storage
            .get_batch(batch_id)?
            .ok_or(Error::BatchNotFound(batch_id))?;

        if record.owner != *caller {
            return Err(Error::Unauthorized);
        }

        Ok(record)
    }

    fn prepare(&self, event: BatchEvent, now: DateTime<Utc>) -> Result<ChangeSet> {
        let sequence = self
            .head
            .sequence
            .checked_add(1)
            .ok_or_else(|| Error::Other("event sequence exhausted".to_string()))?;
        let record = EventRecord::seal(
            sequence,
            event,
            now,
            self.head.hash,
            self.keypair.as_ref(),
        )?;
        Ok(ChangeSet::new(record))
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        self.storage.commit(&changes)?;

        let record = changes.event;
        self.head = EventHead {
            sequence: record.sequence,
            hash: record.hash,
        };
        self.metrics.record_event();

        tracing::info!(
            sequence = record.sequence,
            event = record.event.name(),
            batch_id = record.event.batch_id().map(|id| id.0),
            "Event committed"
        );

        // No subscribers is not an error
        let _ = self.events.send(record);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryFarmDirectory;
    use crate::types::FarmId;
    use crate::Config;
    use tempfile::TempDir;

    struct Fixture {
        state: LedgerState,
        directory: Arc<InMemoryFarmDirectory>,
        _temp: TempDir,
    }

    fn admin() -> Principal {
        Principal::new("admin")
    }

    fn farmer() -> Principal {
        Principal::new("farmer")
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp.path().to_path_buf();

        let storage = Arc::new(Storage::open(&config).unwrap());
        let directory = Arc::new(InMemoryFarmDirectory::with_active([FarmId(1)]));
        directory.set_active(FarmId(2), false);

        let state = LedgerState::load(storage, directory.clone(), admin()).unwrap();
        Fixture {
            state,
            directory,
            _temp: temp,
        }
    }

    fn apples() -> NewBatch {
        NewBatch {
            farm_id: FarmId(1),
            produce_type: "Apples".into(),
            harvest_date: 1_700_000_000,
            batch_hash: vec![0xAB; 32],
            metadata: "Orchard 4".into(),
            organic_practices: vec!["No pesticides".into()],
        }
    }

    #[test]
    fn test_create_allocates_sequential_ids() {
        let mut fx = fixture();

        assert_eq!(fx.state.create_batch(&farmer(), apples()).unwrap(), BatchId(1));
        assert_eq!(fx.state.create_batch(&farmer(), apples()).unwrap(), BatchId(2));
        assert_eq!(fx.state.batch_count(), 2);

        let record = fx.state.get_batch(BatchId(1)).unwrap().unwrap();
        assert_eq!(record.owner, farmer());
        assert!(record.active);
        assert_eq!(record.created_at, record.last_updated_at);
    }

    #[test]
    fn test_create_with_inactive_farm() {
        let mut fx = fixture();
        let mut request = apples();
        request.farm_id = FarmId(2);

        let err = fx.state.create_batch(&farmer(), request).unwrap_err();
        assert!(matches!(err, Error::InactiveFarm(FarmId(2))));
        assert_eq!(err.code(), Some(102));
        assert_eq!(fx.state.batch_count(), 0);
        assert_eq!(fx.state.event_sequence(), 0);
    }

    #[test]
    fn test_inactive_farm_checked_before_fields() {
        let mut fx = fixture();
        let mut request = apples();
        request.farm_id = FarmId(99);
        request.batch_hash = vec![];

        let err = fx.state.create_batch(&farmer(), request).unwrap_err();
        assert!(matches!(err, Error::InactiveFarm(_)));
    }

    #[test]
    fn test_farm_deactivation_does_not_affect_existing_batches() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();

        fx.directory.set_active(FarmId(1), false);

        assert!(fx.state.is_batch_active(batch_id).unwrap());
        let update = BatchUpdate {
            metadata: Some("re-graded".into()),
            version_notes: "grade".into(),
            version: 1,
            ..Default::default()
        };
        assert!(fx.state.update_batch(&farmer(), batch_id, update).is_ok());
    }

    #[test]
    fn test_update_merges_fields_and_writes_version() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        let before = fx.state.get_batch(batch_id).unwrap().unwrap();

        let update = BatchUpdate {
            produce_type: Some("Green Apples".into()),
            batch_hash: Some(vec![0xCD; 32]),
            version_notes: "re-sorted".into(),
            version: 1,
            ..Default::default()
        };
        fx.state.update_batch(&farmer(), batch_id, update).unwrap();

        let after = fx.state.get_batch(batch_id).unwrap().unwrap();
        assert_eq!(after.produce_type, "Green Apples");
        assert_eq!(after.metadata, before.metadata);
        assert_eq!(after.organic_practices, before.organic_practices);
        assert_eq!(after.harvest_date, before.harvest_date);

        let version = fx.state.get_batch_version(batch_id, 1).unwrap().unwrap();
        assert_eq!(version.updated_hash.as_bytes(), &[0xCD; 32]);
        assert_eq!(version.version_notes, "re-sorted");
    }

    #[test]
    fn test_update_by_non_owner_leaves_record_unchanged() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        let before = fx.state.get_batch(batch_id).unwrap().unwrap();

        let update = BatchUpdate {
            metadata: Some("tampered".into()),
            version: 1,
            ..Default::default()
        };
        let err = fx
            .state
            .update_batch(&Principal::new("mallory"), batch_id, update)
            .unwrap_err();

        assert!(matches!(err, Error::Unauthorized));
        assert_eq!(fx.state.get_batch(batch_id).unwrap().unwrap(), before);
        assert!(fx.state.get_batch_version(batch_id, 1).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_batch() {
        let mut fx = fixture();
        let err = fx
            .state
            .update_batch(&farmer(), BatchId(5), BatchUpdate::default())
            .unwrap_err();
        assert!(matches!(err, Error::BatchNotFound(BatchId(5))));
        assert_eq!(err.code(), Some(104));
    }

    #[test]
    fn test_update_with_out_of_bound_field_writes_nothing() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        let before = fx.state.get_batch(batch_id).unwrap().unwrap();

        let long_metadata = BatchUpdate {
            metadata: Some("m".repeat(501)),
            version_notes: "regrade".into(),
            version: 1,
            ..Default::default()
        };
        let long_notes = BatchUpdate {
            version_notes: "n".repeat(201),
            version: 2,
            ..Default::default()
        };

        for update in [long_metadata, long_notes] {
            let version = update.version;
            let err = fx
                .state
                .update_batch(&farmer(), batch_id, update)
                .unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
            assert!(fx.state.get_batch_version(batch_id, version).unwrap().is_none());
        }

        assert_eq!(fx.state.get_batch(batch_id).unwrap().unwrap(), before);
        assert_eq!(fx.state.event_sequence(), 1);
    }

    #[test]
    fn test_update_rejected_after_deactivation() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        fx.state.deactivate_batch(&farmer(), batch_id).unwrap();

        let err = fx
            .state
            .update_batch(&farmer(), batch_id, BatchUpdate::default())
            .unwrap_err();
        assert!(matches!(err, Error::BatchInactive(_)));
        assert_eq!(err.code(), Some(102));
    }

    #[test]
    fn test_deactivate_is_repeatable_and_emits_each_time() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();

        fx.state.deactivate_batch(&farmer(), batch_id).unwrap();
        fx.state.deactivate_batch(&farmer(), batch_id).unwrap();

        assert!(!fx.state.is_batch_active(batch_id).unwrap());
        assert_eq!(fx.state.event_sequence(), 3);
    }

    #[test]
    fn test_deactivate_owner_only() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();

        let err = fx.state.deactivate_batch(&admin(), batch_id).unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert!(fx.state.is_batch_active(batch_id).unwrap());
    }

    #[test]
    fn test_transfer_moves_ownership() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        let distributor = Principal::new("distributor");

        fx.state
            .transfer_batch_ownership(&farmer(), batch_id, distributor.clone(), 1)
            .unwrap();

        let record = fx.state.get_batch(batch_id).unwrap().unwrap();
        assert_eq!(record.owner, distributor);

        let row = fx.state.get_ownership_transfer(batch_id, 1).unwrap().unwrap();
        assert_eq!(row.old_owner, farmer());
        assert_eq!(row.new_owner, distributor);

        // Previous owner lost control
        let err = fx.state.deactivate_batch(&farmer(), batch_id).unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[test]
    fn test_transfer_by_non_owner_rejected() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        let mallory = Principal::new("mallory");

        let err = fx
            .state
            .transfer_batch_ownership(&mallory, batch_id, mallory.clone(), 1)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert_eq!(fx.state.get_batch(batch_id).unwrap().unwrap().owner, farmer());
        assert!(fx.state.get_ownership_transfer(batch_id, 1).unwrap().is_none());
        assert_eq!(fx.state.event_sequence(), 1);
    }

    #[test]
    fn test_transfer_missing_batch() {
        let mut fx = fixture();
        let err = fx
            .state
            .transfer_batch_ownership(&farmer(), BatchId(3), Principal::new("shop"), 1)
            .unwrap_err();
        assert!(matches!(err, Error::BatchNotFound(BatchId(3))));
        assert!(fx.state.get_ownership_transfer(BatchId(3), 1).unwrap().is_none());
        assert_eq!(fx.state.event_sequence(), 0);
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();

        let err = fx
            .state
            .transfer_batch_ownership(&farmer(), batch_id, farmer(), 1)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(fx.state.get_ownership_transfer(batch_id, 1).unwrap().is_none());
    }

    #[test]
    fn test_transfer_allowed_on_inactive_batch() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        fx.state.deactivate_batch(&farmer(), batch_id).unwrap();

        fx.state
            .transfer_batch_ownership(&farmer(), batch_id, Principal::new("archive"), 7)
            .unwrap();
        assert!(!fx.state.is_batch_active(batch_id).unwrap());
    }

    #[test]
    fn test_pause_blocks_only_creation() {
        let mut fx = fixture();
        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();

        fx.state.pause(&admin()).unwrap();
        assert!(fx.state.is_paused());

        let err = fx.state.create_batch(&farmer(), apples()).unwrap_err();
        assert!(matches!(err, Error::Paused));

        let update = BatchUpdate {
            version_notes: "while paused".into(),
            version: 1,
            ..Default::default()
        };
        fx.state.update_batch(&farmer(), batch_id, update).unwrap();
        fx.state
            .transfer_batch_ownership(&farmer(), batch_id, Principal::new("shop"), 1)
            .unwrap();
        fx.state
            .deactivate_batch(&Principal::new("shop"), batch_id)
            .unwrap();

        fx.state.unpause(&admin()).unwrap();
        assert_eq!(fx.state.create_batch(&farmer(), apples()).unwrap(), BatchId(2));
    }

    #[test]
    fn test_pause_requires_administrator() {
        let mut fx = fixture();
        assert!(matches!(fx.state.pause(&farmer()), Err(Error::Unauthorized)));
        assert!(matches!(fx.state.unpause(&farmer()), Err(Error::Unauthorized)));
        assert!(!fx.state.is_paused());
        assert_eq!(fx.state.contract_owner(), &admin());
    }

    #[test]
    fn test_events_published_once_per_success() {
        let mut fx = fixture();
        let mut rx = fx.state.subscribe();

        let batch_id = fx.state.create_batch(&farmer(), apples()).unwrap();
        let _ = fx.state.pause(&farmer());

        let record = rx.try_recv().unwrap();
        assert_eq!(record.sequence, 1);
        assert_eq!(
            record.event,
            BatchEvent::BatchCreated {
                batch_id,
                farm_id: FarmId(1),
                owner: farmer(),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_exhausted_event_sequence_is_a_fault() {
        let mut fx = fixture();
        fx.state.head.sequence = u64::MAX;

        let err = fx.state.create_batch(&farmer(), apples()).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
        assert!(!err.is_domain());
        assert_eq!(fx.state.batch_count(), 0);
        assert!(fx.state.get_batch(BatchId(1)).unwrap().is_none());
    }

    #[test]
    fn test_metrics_track_outcomes() {
        let mut fx = fixture();
        fx.state.create_batch(&farmer(), apples()).unwrap();
        let _ = fx.state.pause(&farmer());

        let metrics = fx.state.metrics();
        assert_eq!(metrics.batches_created.get(), 1);
        assert_eq!(metrics.events_total.get(), 1);
        assert_eq!(
            metrics
                .operations_total
                .with_label_values(&["pause", "100"])
                .get(),
            1
        );
    }
}
