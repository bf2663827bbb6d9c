//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `batches` - Batch records (key: batch_id)
//! - `versions` - Version history (key: batch_id || version)
//! - `transfers` - Ownership transfer history (key: batch_id || transfer_id)
//! - `meta` - Administrative state and event-log head
//! - `events` - Append-only event log (key: sequence)
//!
//! All integers in keys are big-endian so iteration follows numeric order.

use crate::{
    error::{Error, Result},
    events::{EventRecord, GENESIS_HASH},
    types::{AdminState, BatchId, BatchRecord, BatchVersion, OwnershipTransfer},
    Config,
};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Column family names
const CF_BATCHES: &str = "batches";
const CF_VERSIONS: &str = "versions";
const CF_TRANSFERS: &str = "transfers";
const CF_META: &str = "meta";
const CF_EVENTS: &str = "events";

const KEY_ADMIN: &[u8] = b"admin";
const KEY_EVENT_HEAD: &[u8] = b"event_head";

/// Position of the last committed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHead {
    /// Sequence of the last event (0 = empty log)
    pub sequence: u64,
    /// Hash of the last event
    pub hash: [u8; 32],
}

impl Default for EventHead {
    fn default() -> Self {
        Self {
            sequence: 0,
            hash: GENESIS_HASH,
        }
    }
}

/// Everything one successful operation writes
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// New administrative state
    pub admin: Option<AdminState>,
    /// New or modified batch record
    pub batch: Option<BatchRecord>,
    /// Version row to write
    pub version: Option<(BatchId, u64, BatchVersion)>,
    /// Transfer row to write
    pub transfer: Option<(BatchId, u64, OwnershipTransfer)>,
    /// Event describing the change
    pub event: EventRecord,
}

impl ChangeSet {
    /// Change set carrying only an event
    pub fn new(event: EventRecord) -> Self {
        Self {
            admin: None,
            batch: None,
            version: None,
            transfer: None,
            event,
        }
    }
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    path: PathBuf,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").field("path", &self.path).finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_BATCHES, Self::cf_options_lz4()),
            ColumnFamilyDescriptor::new(CF_VERSIONS, Self::cf_options_zstd()),
            ColumnFamilyDescriptor::new(CF_TRANSFERS, Self::cf_options_zstd()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_zstd()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB");

        Ok(Self {
            db: Arc::new(db),
            path: path.clone(),
        })
    }

    // Column family options

    fn cf_options_lz4() -> Options {
        let mut opts = Options::default();
        // Batch records are read on every mutation, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_zstd() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(&cf, key)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Administrative state

    /// Load administrative state, `None` for a fresh database
    pub fn load_admin_state(&self) -> Result<Option<AdminState>> {
        self.get(CF_META, KEY_ADMIN)
    }

    /// Record administrative state for a fresh database
    pub fn initialize_admin_state(&self, admin: &AdminState) -> Result<()> {
        let cf = self.cf(CF_META)?;
        self.db.put_cf(&cf, KEY_ADMIN, bincode::serialize(admin)?)?;

        tracing::info!(administrator = %admin.administrator, "Initialized ledger state");
        Ok(())
    }

    /// Load the event-log head
    pub fn load_event_head(&self) -> Result<EventHead> {
        Ok(self.get(CF_META, KEY_EVENT_HEAD)?.unwrap_or_default())
    }

    // Table reads

    /// Get batch record
    pub fn get_batch(&self, batch_id: BatchId) -> Result<Option<BatchRecord>> {
        self.get(CF_BATCHES, &batch_id.to_key())
    }

    /// Get version row
    pub fn get_version(&self, batch_id: BatchId, version: u64) -> Result<Option<BatchVersion>> {
        self.get(CF_VERSIONS, &history_key(batch_id, version))
    }

    /// Get transfer row
    pub fn get_transfer(
        &self,
        batch_id: BatchId,
        transfer_id: u64,
    ) -> Result<Option<OwnershipTransfer>> {
        self.get(CF_TRANSFERS, &history_key(batch_id, transfer_id))
    }

    /// All version rows of a batch, ordered by version key
    pub fn list_versions(&self, batch_id: BatchId) -> Result<Vec<(u64, BatchVersion)>> {
        self.scan_history(CF_VERSIONS, batch_id)
    }

    /// All transfer rows of a batch, ordered by transfer key
    pub fn list_transfers(&self, batch_id: BatchId) -> Result<Vec<(u64, OwnershipTransfer)>> {
        self.scan_history(CF_TRANSFERS, batch_id)
    }

    fn scan_history<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        batch_id: BatchId,
    ) -> Result<Vec<(u64, T)>> {
        let cf = self.cf(cf_name)?;
        let prefix = batch_id.to_key();
        let start = history_key(batch_id, 0);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&start, Direction::Forward));

        let mut rows = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let index: [u8; 8] = key
                .get(8..16)
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| Error::Storage(format!("Malformed key in {}", cf_name)))?;
            rows.push((u64::from_be_bytes(index), bincode::deserialize(&value)?));
        }

        Ok(rows)
    }

    /// Events with `sequence >= from`, at most `limit`
    pub fn events_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>> {
        let cf = self.cf(CF_EVENTS)?;
        let start = from.to_be_bytes();

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&start, Direction::Forward));

        let mut events = Vec::new();
        for item in iter.take(limit) {
            let (_, value) = item?;
            events.push(bincode::deserialize(&value)?);
        }

        Ok(events)
    }

    // Atomic commit

    /// Write one operation's changes and its event in a single batch
    pub fn commit(&self, changes: &ChangeSet) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_meta = self.cf(CF_META)?;
        if let Some(ref admin) = changes.admin {
            batch.put_cf(&cf_meta, KEY_ADMIN, bincode::serialize(admin)?);
        }

        if let Some(ref record) = changes.batch {
            let cf = self.cf(CF_BATCHES)?;
            batch.put_cf(&cf, record.batch_id.to_key(), bincode::serialize(record)?);
        }

        if let Some((batch_id, version, ref row)) = changes.version {
            let cf = self.cf(CF_VERSIONS)?;
            batch.put_cf(&cf, history_key(batch_id, version), bincode::serialize(row)?);
        }

        if let Some((batch_id, transfer_id, ref row)) = changes.transfer {
            let cf = self.cf(CF_TRANSFERS)?;
            batch.put_cf(&cf, history_key(batch_id, transfer_id), bincode::serialize(row)?);
        }

        let event = &changes.event;
        let cf_events = self.cf(CF_EVENTS)?;
        batch.put_cf(&cf_events, event.sequence.to_be_bytes(), bincode::serialize(event)?);

        let head = EventHead {
            sequence: event.sequence,
            hash: event.hash,
        };
        batch.put_cf(&cf_meta, KEY_EVENT_HEAD, bincode::serialize(&head)?);

        self.db.write(batch)?;

        tracing::debug!(
            sequence = event.sequence,
            event = event.event.name(),
            "Change set committed"
        );

        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_batches: self.approximate_count(CF_BATCHES)?,
            total_versions: self.approximate_count(CF_VERSIONS)?,
            total_transfers: self.approximate_count(CF_TRANSFERS)?,
            total_events: self.load_event_head()?.sequence,
        })
    }

    fn approximate_count(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf(cf_name)?;
        let prop = self
            .db
            .property_int_value_cf(&cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }
}

fn history_key(batch_id: BatchId, index: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&batch_id.to_key());
    key[8..].copy_from_slice(&index.to_be_bytes());
    key
}

/// Storage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    /// Approximate number of batch records
    pub total_batches: u64,
    /// Approximate number of version rows
    pub total_versions: u64,
    /// Approximate number of transfer rows
    pub total_transfers: u64,
    /// Exact number of events
    pub total_events: u64,
}
