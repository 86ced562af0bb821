use std::sync::Arc;

use tgstore_core::{BackendClass, FileRecord, Locator, MetadataStore, NewFileRecord};
use tracing::{debug, info, warn};

use crate::{
    BackendPool, Decline, Outcome, StorageConfig, StorageError, StorageResult, UploadRequest,
};

/// Stores payloads on the first backend class that accepts them.
///
/// Classes are tried in [`BackendClass::UPLOAD_ORDER`], one attempt each.
/// A class is skipped when it has no backends or the payload is above its
/// ceiling; a declined upload falls through to the next class. Transport
/// errors are returned as they are.
pub struct UploadRouter {
    pool: Arc<BackendPool>,
    metadata: Arc<dyn MetadataStore>,
    config: StorageConfig,
}

impl UploadRouter {
    pub fn new(pool: Arc<BackendPool>, metadata: Arc<dyn MetadataStore>, config: StorageConfig) -> Self {
        Self {
            pool,
            metadata,
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Store `request` and persist its record.
    ///
    /// `Ok(None)` means no class could store the file. Exactly one record is
    /// created per `Ok(Some(_))` and none otherwise.
    pub async fn upload(&self, request: &UploadRequest) -> StorageResult<Option<FileRecord>> {
        if self.pool.is_empty() {
            return Err(StorageError::Unavailable);
        }
        self.pool.ensure_ready()?;

        let Some((class, locator)) = self.store(request).await? else {
            info!(
                request_id = %request.request_id,
                filename = %request.filename,
                size = request.size,
                "No backend class stored the file"
            );
            return Ok(None);
        };

        let record = self.metadata.create(NewFileRecord::new(class, locator)).await?;
        info!(
            request_id = %request.request_id,
            record_id = record.id,
            class = %class,
            size = request.size,
            "File stored"
        );
        Ok(Some(record))
    }

    async fn store(&self, request: &UploadRequest) -> StorageResult<Option<(BackendClass, Locator)>> {
        for class in BackendClass::UPLOAD_ORDER {
            if !self.pool.has(class) {
                debug!(request_id = %request.request_id, class = %class, "Class has no backends, skipping");
                continue;
            }

            if let Some(ceiling) = self.config.ceiling(class) {
                if request.size > ceiling {
                    let decline = Decline::TooLarge {
                        size: request.size,
                        ceiling,
                    };
                    debug!(request_id = %request.request_id, class = %class, %decline, "Skipping class");
                    continue;
                }
            }

            let backend = self.pool.next(class)?;
            debug!(
                request_id = %request.request_id,
                class = %class,
                backend = backend.name(),
                "Uploading"
            );

            match backend.upload(request).await {
                Ok(Outcome::Done(locator)) => return Ok(Some((class, locator))),
                Ok(Outcome::Declined(decline)) => {
                    debug!(
                        request_id = %request.request_id,
                        class = %class,
                        backend = backend.name(),
                        %decline,
                        "Upload declined"
                    );
                }
                Err(err) => {
                    warn!(
                        request_id = %request.request_id,
                        class = %class,
                        backend = backend.name(),
                        error = %err,
                        "Upload failed"
                    );
                    return Err(err);
                }
            }
        }

        Ok(None)
    }
}
