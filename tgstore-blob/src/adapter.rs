use std::sync::Arc;

use tgstore_core::{FileRecord, Locator, MetadataStore};
use tracing::info;

use crate::{
    BackendPool, ByteStream, DownloadRouter, StorageConfig, StorageResult, UploadRequest,
    UploadRouter,
};

/// The storage facade handed to the HTTP layer.
///
/// Bundles the backend pool, both routers and the metadata store.
pub struct FileStorage {
    pool: Arc<BackendPool>,
    metadata: Arc<dyn MetadataStore>,
    uploads: UploadRouter,
    downloads: DownloadRouter,
}

impl FileStorage {
    /// Create a new storage facade
    pub fn new(pool: BackendPool, metadata: Arc<dyn MetadataStore>, config: StorageConfig) -> Self {
        let pool = Arc::new(pool);
        Self {
            uploads: UploadRouter::new(Arc::clone(&pool), Arc::clone(&metadata), config),
            downloads: DownloadRouter::new(Arc::clone(&pool)),
            pool,
            metadata,
        }
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    pub fn config(&self) -> &StorageConfig {
        self.uploads.config()
    }

    /// Prepare every backend; see [`BackendPool::prepare`].
    pub async fn prepare(&self) -> StorageResult<()> {
        self.pool.prepare().await
    }

    /// Store a file. `Ok(None)` when no backend class accepted it.
    pub async fn upload(&self, request: &UploadRequest) -> StorageResult<Option<FileRecord>> {
        self.uploads.upload(request).await
    }

    pub async fn get(&self, id: i64) -> StorageResult<Option<FileRecord>> {
        Ok(self.metadata.get(id).await?)
    }

    pub async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        Ok(self.metadata.list().await?)
    }

    /// Forget a record. The message itself stays on the platform.
    pub async fn delete(&self, id: i64) -> StorageResult<Option<FileRecord>> {
        let deleted = self.metadata.delete(id).await?;
        if let Some(record) = &deleted {
            info!(record_id = record.id, class = %record.backend, "File record deleted");
        }
        Ok(deleted)
    }

    /// Stream a persisted record's blob.
    pub async fn download(&self, record: &FileRecord) -> StorageResult<Option<ByteStream>> {
        self.downloads.download_record(record).await
    }

    /// Stream a blob by locator alone, probing each class.
    pub async fn download_by_locator(&self, locator: &Locator) -> StorageResult<Option<ByteStream>> {
        self.downloads.download_locator(locator).await
    }
}
