use async_trait::async_trait;
use tgstore_core::{BackendClass, Locator};

use crate::{ByteStream, Outcome, StorageResult, UploadRequest};

/// One authenticated messaging session used as blob storage.
///
/// A backend must be prepared before the pool hands it out. `prepare` is
/// idempotent: the first success moves it to ready, later calls return
/// immediately.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Class this backend belongs to
    fn class(&self) -> BackendClass;

    /// Non-secret label for logs
    fn name(&self) -> &str;

    /// Authenticate against the platform
    async fn prepare(&self) -> StorageResult<()>;

    fn is_ready(&self) -> bool;

    /// Store the payload and return its locator.
    ///
    /// Content the platform refuses is `Declined`; anything that makes the
    /// backend itself unusable is `Err`.
    async fn upload(&self, request: &UploadRequest) -> StorageResult<Outcome<Locator>>;

    /// Open a lazy stream over the blob at `locator`.
    async fn download(&self, locator: &Locator) -> StorageResult<Outcome<ByteStream>>;
}
