//! Quad store
//!
//! Every quad is written under four sorted index permutations (SPOL, POSL,
//! OSPL, LSPO) in one atomic batch. There is no node table: a node exists
//! while it is the subject or object of at least one quad.
//!
//! Writers go through a [`QuadWriter`] session that stages quads and commits
//! them all-or-nothing. Writers are serialized by a store-wide lock; readers
//! never take it, and only ever observe fully committed batches.

use crate::config::{ConfigError, StoreConfig};
use crate::quad::{IndexKind, Quad, QuadPattern};
use crate::storage::{open_backend, KeyScan, StorageBackend, StorageError, WriteBatch};
use crate::value::{Value, ValueError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const FORMAT_VERSION: u32 = 1;

/// Quad store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Subject, predicate or object is empty
    #[error("Incomplete quad: {0}")]
    IncompleteQuad(String),

    /// Quad already present and duplicates are not ignored
    #[error("Quad already exists: {0}")]
    QuadExists(String),

    /// Quad absent and missing references are not ignored
    #[error("Quad not found: {0}")]
    QuadNotFound(String),

    /// Backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Undecodable index key
    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of adding one quad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
}

/// Result of removing one quad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Summary of one committed writer session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub added: usize,
    pub duplicates: usize,
    pub removed: usize,
    pub missing: usize,
}

/// Persisted store metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreMeta {
    format_version: u32,
    quad_count: u64,
}

struct StoreInner {
    id: Uuid,
    backend: Box<dyn StorageBackend>,
    config: StoreConfig,
    quad_count: AtomicU64,
    writer: Mutex<()>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Err(e) = self.backend.flush() {
            warn!("Failed to flush {} storage on release: {}", self.backend.name(), e);
        }
    }
}

/// Handle to an open quad store. Clones share the same storage.
#[derive(Clone)]
pub struct QuadStore {
    inner: Arc<StoreInner>,
}

impl QuadStore {
    /// Open the store described by the configuration
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let backend = open_backend(&config.backend)?;
        Self::with_backend(backend, config)
    }

    /// Open a store at a locator (`memory:`, `rocksdb:<path>` or a path)
    pub fn open_locator(locator: &str, ignore_missing: bool, ignore_duplicates: bool) -> StoreResult<Self> {
        let config = StoreConfig::from_locator(locator)?
            .with_ignore_missing(ignore_missing)
            .with_ignore_duplicates(ignore_duplicates);
        Self::open(config)
    }

    /// In-memory store with the given policies
    pub fn memory(ignore_missing: bool, ignore_duplicates: bool) -> StoreResult<Self> {
        Self::open(
            StoreConfig::memory()
                .with_ignore_missing(ignore_missing)
                .with_ignore_duplicates(ignore_duplicates),
        )
    }

    /// Wrap an already opened backend
    pub fn with_backend(backend: Box<dyn StorageBackend>, config: StoreConfig) -> StoreResult<Self> {
        let quad_count = match backend.read_meta()? {
            Some(bytes) => {
                let meta: StoreMeta = bincode::deserialize(&bytes).map_err(StorageError::from)?;
                if meta.format_version != FORMAT_VERSION {
                    return Err(StorageError::Corrupt(format!(
                        "unsupported format version {}",
                        meta.format_version
                    ))
                    .into());
                }
                meta.quad_count
            }
            None => 0,
        };

        let id = Uuid::new_v4();
        info!(
            "Opened {} quad store {} with {} quads (ignore_missing={}, ignore_duplicates={})",
            backend.name(),
            id,
            quad_count,
            config.ignore_missing,
            config.ignore_duplicates
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                id,
                backend,
                config,
                quad_count: AtomicU64::new(quad_count),
                writer: Mutex::new(()),
            }),
        })
    }

    /// Flush and release this handle. Storage is released once every clone
    /// and every query borrowing it is gone.
    pub fn close(self) -> StoreResult<()> {
        self.inner.backend.flush()?;
        info!("Closed {} quad store", self.inner.backend.name());
        Ok(())
    }

    /// Identity of the opened store, shared by all clones of this handle
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn ignore_missing(&self) -> bool {
        self.inner.config.ignore_missing
    }

    pub fn ignore_duplicates(&self) -> bool {
        self.inner.config.ignore_duplicates
    }

    /// Number of quads in the store
    pub fn len(&self) -> usize {
        self.inner.quad_count.load(Ordering::Acquire) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a writer session
    pub fn writer(&self) -> QuadWriter<'_> {
        QuadWriter {
            store: self,
            staged: Vec::new(),
        }
    }

    /// Add one quad
    pub fn add_quad(&self, quad: Quad) -> StoreResult<AddOutcome> {
        let mut writer = self.writer();
        writer.write_quad(quad);
        let summary = writer.commit()?;
        Ok(if summary.added == 1 {
            AddOutcome::Added
        } else {
            AddOutcome::Duplicate
        })
    }

    /// Add a batch of quads; either all of it becomes visible or none
    pub fn add_quads(&self, quads: impl IntoIterator<Item = Quad>) -> StoreResult<CommitSummary> {
        let mut writer = self.writer();
        writer.write_quads(quads);
        writer.commit()
    }

    /// Remove one quad
    pub fn remove_quad(&self, quad: Quad) -> StoreResult<RemoveOutcome> {
        let mut writer = self.writer();
        writer.remove_quad(quad);
        let summary = writer.commit()?;
        Ok(if summary.removed == 1 {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        })
    }

    /// Check if a quad exists
    pub fn contains(&self, quad: &Quad) -> StoreResult<bool> {
        let index = IndexKind::Spol;
        Ok(self.inner.backend.contains(index, &index.key(quad))?)
    }

    /// A node exists while it is the subject or object of some quad
    pub fn node_exists(&self, node: &Value) -> StoreResult<bool> {
        let prefix = node.encode();
        let backend = &self.inner.backend;
        Ok(backend.has_prefix(IndexKind::Spol, &prefix)? || backend.has_prefix(IndexKind::Ospl, &prefix)?)
    }

    /// Quads matching a pattern, in the key order of the index used
    pub fn quads_matching(&self, pattern: &QuadPattern) -> StoreResult<QuadIter<'_>> {
        let (index, prefix) = IndexKind::plan(pattern);
        let keys = self.inner.backend.scan_prefix(index, &prefix)?;
        Ok(QuadIter {
            index,
            keys,
            pattern: pattern.clone(),
        })
    }

    /// First quad matching a pattern in index order. Reads only as far as
    /// the first match.
    pub fn first_matching(&self, pattern: &QuadPattern) -> StoreResult<Option<Quad>> {
        self.quads_matching(pattern)?.next().transpose()
    }

    /// Quads with the given subject, in SPOL order
    pub fn quads_with_subject(&self, subject: &Value) -> StoreResult<QuadIter<'_>> {
        self.quads_matching(&QuadPattern::any().with_subject(subject.clone()))
    }

    /// Quads with the given predicate, in POSL order
    pub fn quads_with_predicate(&self, predicate: &Value) -> StoreResult<QuadIter<'_>> {
        self.quads_matching(&QuadPattern::any().with_predicate(predicate.clone()))
    }

    /// Quads with the given object, in OSPL order
    pub fn quads_with_object(&self, object: &Value) -> StoreResult<QuadIter<'_>> {
        self.quads_matching(&QuadPattern::any().with_object(object.clone()))
    }

    /// Quads in the given named graph, in LSPO order
    pub fn quads_with_label(&self, label: &Value) -> StoreResult<QuadIter<'_>> {
        self.quads_matching(&QuadPattern::any().with_label(Some(label.clone())))
    }

    /// Wrap explicit seed nodes as a traversal start
    pub fn fixed(&self, values: impl IntoIterator<Item = Value>) -> Fixed {
        Fixed {
            values: values.into_iter().collect(),
        }
    }

    fn commit_staged(&self, staged: Vec<StagedOp>) -> StoreResult<CommitSummary> {
        let config = &self.inner.config;
        let backend = &self.inner.backend;
        let _guard = self
            .inner
            .writer
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;

        // Presence as seen by this batch so far, overriding the backend
        let mut overlay: FxHashMap<Quad, bool> = FxHashMap::default();
        let mut summary = CommitSummary::default();
        let mut batch = WriteBatch::new();

        for op in staged {
            let (quad, adding) = match op {
                StagedOp::Add(q) => (q, true),
                StagedOp::Remove(q) => (q, false),
            };
            if !quad.is_complete() {
                return Err(StoreError::IncompleteQuad(quad.to_string()));
            }
            let present = match overlay.get(&quad) {
                Some(present) => *present,
                None => self.contains(&quad)?,
            };
            match (adding, present) {
                (true, true) => {
                    if !config.ignore_duplicates {
                        return Err(StoreError::QuadExists(quad.to_string()));
                    }
                    summary.duplicates += 1;
                }
                (false, false) => {
                    if !config.ignore_missing {
                        return Err(StoreError::QuadNotFound(quad.to_string()));
                    }
                    summary.missing += 1;
                }
                (true, false) => {
                    for index in IndexKind::ALL {
                        batch.put(index, index.key(&quad));
                    }
                    overlay.insert(quad, true);
                    summary.added += 1;
                }
                (false, true) => {
                    for index in IndexKind::ALL {
                        batch.delete(index, index.key(&quad));
                    }
                    overlay.insert(quad, false);
                    summary.removed += 1;
                }
            }
        }

        if summary.added == 0 && summary.removed == 0 {
            return Ok(summary);
        }

        let before = self.inner.quad_count.load(Ordering::Acquire);
        let after = before + summary.added as u64 - summary.removed as u64;
        let meta = StoreMeta {
            format_version: FORMAT_VERSION,
            quad_count: after,
        };
        batch.set_meta(bincode::serialize(&meta).map_err(StorageError::from)?);
        let op_count = batch.len();
        backend.commit(batch)?;
        self.inner.quad_count.store(after, Ordering::Release);

        debug!(
            "Committed batch: {} added, {} duplicates, {} removed, {} missing ({} index ops)",
            summary.added, summary.duplicates, summary.removed, summary.missing, op_count
        );
        Ok(summary)
    }
}

#[derive(Debug, Clone)]
enum StagedOp {
    Add(Quad),
    Remove(Quad),
}

/// Writer session staging quads until [`QuadWriter::commit`].
///
/// Dropping a writer without committing discards everything staged.
pub struct QuadWriter<'s> {
    store: &'s QuadStore,
    staged: Vec<StagedOp>,
}

impl<'s> QuadWriter<'s> {
    /// Stage a quad for addition
    pub fn write_quad(&mut self, quad: Quad) {
        self.staged.push(StagedOp::Add(quad));
    }

    /// Stage several quads for addition
    pub fn write_quads(&mut self, quads: impl IntoIterator<Item = Quad>) {
        self.staged.extend(quads.into_iter().map(StagedOp::Add));
    }

    /// Stage a quad for removal
    pub fn remove_quad(&mut self, quad: Quad) {
        self.staged.push(StagedOp::Remove(quad));
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Apply everything staged as one atomic batch
    pub fn commit(self) -> StoreResult<CommitSummary> {
        self.store.commit_staged(self.staged)
    }
}

/// Quads from one index scan, read and decoded as they are pulled.
///
/// The scan sees the store as it was when the iterator was created; calling
/// the store method again starts a fresh scan.
pub struct QuadIter<'s> {
    index: IndexKind,
    keys: KeyScan<'s>,
    pattern: QuadPattern,
}

impl Iterator for QuadIter<'_> {
    type Item = StoreResult<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        for key in self.keys.by_ref() {
            let key = match key {
                Ok(key) => key,
                Err(e) => return Some(Err(e.into())),
            };
            match self.index.decode(&key) {
                Ok(quad) if self.pattern.matches(&quad) => return Some(Ok(quad)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }
}

/// Explicit set of seed nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fixed {
    values: Vec<Value>,
}

impl Fixed {
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl IntoIterator for Fixed {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
