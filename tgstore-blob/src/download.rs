use std::sync::Arc;

use tgstore_core::{BackendClass, FileRecord, Locator};
use tracing::{debug, warn};

use crate::{BackendPool, ByteStream, Outcome, StorageError, StorageResult};

/// Resolves stored locators back to byte streams.
///
/// Any backend of a class can serve a locator written by another backend of
/// the same class, since they all post to the same target.
pub struct DownloadRouter {
    pool: Arc<BackendPool>,
}

impl DownloadRouter {
    pub fn new(pool: Arc<BackendPool>) -> Self {
        Self { pool }
    }

    /// Stream the blob of a persisted record from its recorded class.
    pub async fn download_record(&self, record: &FileRecord) -> StorageResult<Option<ByteStream>> {
        self.pool.ensure_ready()?;
        self.try_class(record.backend, &record.data).await
    }

    /// Stream a blob whose class is unknown, probing every class in order.
    pub async fn download_locator(&self, locator: &Locator) -> StorageResult<Option<ByteStream>> {
        if self.pool.is_empty() {
            return Err(StorageError::Unavailable);
        }
        self.pool.ensure_ready()?;

        for class in BackendClass::UPLOAD_ORDER {
            if let Some(stream) = self.try_class(class, locator).await? {
                return Ok(Some(stream));
            }
        }

        debug!(locator = ?locator, "No class holds the locator");
        Ok(None)
    }

    async fn try_class(&self, class: BackendClass, locator: &Locator) -> StorageResult<Option<ByteStream>> {
        if !self.pool.has(class) {
            debug!(class = %class, "Class has no backends, skipping");
            return Ok(None);
        }

        let backend = self.pool.next(class)?;
        match backend.download(locator).await {
            Ok(Outcome::Done(stream)) => {
                debug!(class = %class, backend = backend.name(), "Download opened");
                Ok(Some(stream))
            }
            Ok(Outcome::Declined(decline)) => {
                debug!(class = %class, backend = backend.name(), %decline, "Download declined");
                Ok(None)
            }
            Err(err) => {
                warn!(class = %class, backend = backend.name(), error = %err, "Download failed");
                Err(err)
            }
        }
    }
}
