//! Ordered key-range storage backends
//!
//! The quad store only needs point reads, ordered prefix scans and atomic
//! batch commits over a handful of keyspaces. [`MemoryBackend`] keeps them in
//! copy-on-write `BTreeSet`s behind a lock; [`RocksDbBackend`] keeps one
//! column family per index permutation plus one for store metadata.
//!
//! Prefix scans are lazy and read from a snapshot taken when the scan
//! starts, so a scan never observes part of a batch committed after it.

use crate::config::BackendConfig;
use crate::quad::IndexKind;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use std::collections::BTreeSet;
use std::ops::Bound;
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info};

const META_CF: &str = "meta";
const META_KEY: &[u8] = b"store";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// Stored data could not be interpreted
    #[error("Corrupt index data: {0}")]
    Corrupt(String),

    /// A lock was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Ordered keys of one prefix scan, pulled on demand
pub type KeyScan<'a> = Box<dyn Iterator<Item = StorageResult<Vec<u8>>> + 'a>;

/// A single staged mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { index: IndexKind, key: Vec<u8> },
    Delete { index: IndexKind, key: Vec<u8> },
}

/// Mutations applied all-or-nothing by [`StorageBackend::commit`]
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
    meta: Option<Vec<u8>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, index: IndexKind, key: Vec<u8>) {
        self.ops.push(BatchOp::Put { index, key });
    }

    pub fn delete(&mut self, index: IndexKind, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { index, key });
    }

    /// Replace the metadata record as part of this batch
    pub fn set_meta(&mut self, meta: Vec<u8>) {
        self.meta = Some(meta);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.meta.is_none()
    }
}

/// Ordered key-range storage
///
/// Keys carry all the information; values are empty. Scans return keys in
/// ascending byte order and observe either all or none of a committed batch.
pub trait StorageBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Point lookup
    fn contains(&self, index: IndexKind, key: &[u8]) -> StorageResult<bool>;

    /// Keys starting with `prefix`, in key order, read from a snapshot
    fn scan_prefix<'a>(&'a self, index: IndexKind, prefix: &[u8]) -> StorageResult<KeyScan<'a>>;

    /// Whether at least one key starts with `prefix`
    fn has_prefix(&self, index: IndexKind, prefix: &[u8]) -> StorageResult<bool>;

    /// Read the metadata record
    fn read_meta(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Apply a batch atomically
    fn commit(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Make committed data durable
    fn flush(&self) -> StorageResult<()>;
}

/// Open the backend selected by the configuration
pub fn open_backend(config: &BackendConfig) -> StorageResult<Box<dyn StorageBackend>> {
    match config {
        BackendConfig::Memory => Ok(Box::new(MemoryBackend::new())),
        BackendConfig::RocksDb { path } => Ok(Box::new(RocksDbBackend::open(path)?)),
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    indexes: [Arc<BTreeSet<Vec<u8>>>; 4],
    meta: Option<Vec<u8>>,
}

/// In-memory backend. Readers share the lock; a commit takes it exclusively,
/// so a batch becomes visible in one step.
///
/// A scan holds its own reference to the index set it reads. A commit that
/// lands while scans are open copies the set first and leaves theirs intact.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn contains(&self, index: IndexKind, key: &[u8]) -> StorageResult<bool> {
        Ok(self.read()?.indexes[index as usize].contains(key))
    }

    fn scan_prefix<'a>(&'a self, index: IndexKind, prefix: &[u8]) -> StorageResult<KeyScan<'a>> {
        let keys = Arc::clone(&self.read()?.indexes[index as usize]);
        Ok(Box::new(MemoryScan {
            keys,
            prefix: prefix.to_vec(),
            last: None,
            done: false,
        }))
    }

    fn has_prefix(&self, index: IndexKind, prefix: &[u8]) -> StorageResult<bool> {
        let state = self.read()?;
        Ok(state.indexes[index as usize]
            .range(prefix.to_vec()..)
            .next()
            .is_some_and(|key| key.starts_with(prefix)))
    }

    fn read_meta(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.read()?.meta.clone())
    }

    fn commit(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        for op in batch.ops {
            match op {
                BatchOp::Put { index, key } => {
                    Arc::make_mut(&mut state.indexes[index as usize]).insert(key);
                }
                BatchOp::Delete { index, key } => {
                    Arc::make_mut(&mut state.indexes[index as usize]).remove(&key);
                }
            }
        }
        if let Some(meta) = batch.meta {
            state.meta = Some(meta);
        }
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Prefix scan over one snapshot of a memory index, resuming after the last
/// key returned
struct MemoryScan {
    keys: Arc<BTreeSet<Vec<u8>>>,
    prefix: Vec<u8>,
    last: Option<Vec<u8>>,
    done: bool,
}

impl Iterator for MemoryScan {
    type Item = StorageResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let lower = match self.last.take() {
            Some(last) => Bound::Excluded(last),
            None => Bound::Included(self.prefix.clone()),
        };
        match self
            .keys
            .range::<Vec<u8>, _>((lower, Bound::Unbounded))
            .next()
        {
            Some(key) if key.starts_with(&self.prefix) => {
                self.last = Some(key.clone());
                Some(Ok(key.clone()))
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

/// RocksDB-based backend
pub struct RocksDbBackend {
    db: DB,
    path: String,
}

impl RocksDbBackend {
    /// Open or create a database directory
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path_str = path.as_ref().to_string_lossy().into_owned();

        info!("Opening RocksDB quad storage at: {}", path_str);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

        let mut cf_descriptors: Vec<ColumnFamilyDescriptor> = IndexKind::ALL
            .iter()
            .map(|index| ColumnFamilyDescriptor::new(index.name(), Self::index_cf_options()))
            .collect();
        cf_descriptors.push(ColumnFamilyDescriptor::new(META_CF, Options::default()));

        let db = DB::open_cf_descriptors(&opts, &path_str, cf_descriptors)?;

        info!("RocksDB quad storage opened");

        Ok(Self { db, path: path_str })
    }

    /// Column family options for index keyspaces
    fn index_cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    /// Directory this backend was opened at
    pub fn path(&self) -> &str {
        &self.path
    }

    fn cf(&self, name: &str) -> StorageResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }
}

impl StorageBackend for RocksDbBackend {
    fn name(&self) -> &'static str {
        "rocksdb"
    }

    fn contains(&self, index: IndexKind, key: &[u8]) -> StorageResult<bool> {
        let cf = self.cf(index.name())?;
        Ok(self.db.get_cf(cf, key)?.is_some())
    }

    fn scan_prefix<'a>(&'a self, index: IndexKind, prefix: &[u8]) -> StorageResult<KeyScan<'a>> {
        let cf = self.cf(index.name())?;
        let owned_prefix = prefix.to_vec();
        // The iterator pins an implicit snapshot for its whole lifetime
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
            .map(|item| item.map(|(key, _)| key.into_vec()).map_err(StorageError::from))
            .take_while(move |item| match item {
                Ok(key) => key.starts_with(&owned_prefix),
                Err(_) => true,
            });
        Ok(Box::new(iter))
    }

    fn has_prefix(&self, index: IndexKind, prefix: &[u8]) -> StorageResult<bool> {
        let cf = self.cf(index.name())?;
        let mut iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        match iter.next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(key.starts_with(prefix))
            }
            None => Ok(false),
        }
    }

    fn read_meta(&self) -> StorageResult<Option<Vec<u8>>> {
        let cf = self.cf(META_CF)?;
        Ok(self.db.get_cf(cf, META_KEY)?)
    }

    fn commit(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut wb = rocksdb::WriteBatch::default();
        let op_count = batch.ops.len();
        for op in batch.ops {
            match op {
                BatchOp::Put { index, key } => wb.put_cf(self.cf(index.name())?, key, b""),
                BatchOp::Delete { index, key } => wb.delete_cf(self.cf(index.name())?, key),
            }
        }
        if let Some(meta) = batch.meta {
            wb.put_cf(self.cf(META_CF)?, META_KEY, meta);
        }
        self.db.write(wb)?;
        debug!("Committed {} index operations to {}", op_count, self.path);
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        for index in IndexKind::ALL {
            self.db.flush_cf(self.cf(index.name())?)?;
        }
        debug!("Flushed storage to disk");
        Ok(())
    }
}
