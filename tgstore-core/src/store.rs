use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{FileRecord, NewFileRecord, UnknownBackendClass};

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors raised by a metadata store
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MetadataError {
    pub(crate) fn corrupt(id: i64, err: UnknownBackendClass) -> Self {
        Self::Corrupt {
            id,
            reason: err.to_string(),
        }
    }
}

/// Persistence of file records.
///
/// Implementations assign ids; ids are unique and increase with every create.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a new record and return it with its id and upload time.
    async fn create(&self, record: NewFileRecord) -> MetadataResult<FileRecord>;

    async fn get(&self, id: i64) -> MetadataResult<Option<FileRecord>>;

    /// All records, oldest first.
    async fn list(&self) -> MetadataResult<Vec<FileRecord>>;

    /// Remove a record, returning what was removed.
    async fn delete(&self, id: i64) -> MetadataResult<Option<FileRecord>>;
}

/// In-memory store for tests and throwaway deployments
#[derive(Debug)]
pub struct MemoryMetadataStore {
    records: RwLock<BTreeMap<i64, FileRecord>>,
    next_id: AtomicI64,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create(&self, record: NewFileRecord) -> MetadataResult<FileRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = FileRecord {
            id,
            backend: record.backend,
            data: record.data,
            upload_time: Utc::now(),
        };

        self.records.write().insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> MetadataResult<Option<FileRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn list(&self) -> MetadataResult<Vec<FileRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn delete(&self, id: i64) -> MetadataResult<Option<FileRecord>> {
        Ok(self.records.write().remove(&id))
    }
}
