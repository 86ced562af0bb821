//! # tgstore-blob: messaging accounts as blob storage
//!
//! A [`BackendPool`] holds authenticated sessions partitioned by
//! [`BackendClass`]. The [`UploadRouter`] offers each file to the classes in
//! order, skipping a class whose ceiling the file exceeds and falling through
//! when a backend declines the content. The [`DownloadRouter`] resolves a
//! stored locator back to a lazy byte stream.
//!
//! ```text
//! ┌─────────────────┐
//! │   FileStorage   │  ← facade used by the HTTP layer
//! ├─────────────────┤
//! │ Upload/Download │  ← class order, ceilings, fallback
//! ├─────────────────┤
//! │   BackendPool   │  ← round-robin per class
//! ├─────────────────┤
//! │     Backend     │  ← one session (Telegram, memory)
//! └─────────────────┘
//! ```
//!
//! Every backend call has three possible results: `Ok(Outcome::Done)`,
//! `Ok(Outcome::Declined)` which the routers treat as "try elsewhere", and
//! `Err` which they propagate.

mod adapter;
mod backend;
mod config;
mod download;
mod error;
pub mod memory;
mod pool;
pub mod telegram;
mod types;
mod upload;

pub use adapter::FileStorage;
pub use backend::Backend;
pub use config::{StorageConfig, DEFAULT_PRIMARY_MAX_UPLOAD_BYTES};
pub use download::DownloadRouter;
pub use error::{StorageError, StorageResult};
pub use pool::BackendPool;
pub use types::{ByteStream, Decline, MessageLocator, Outcome, Payload, UploadRequest};
pub use upload::UploadRouter;

pub use tgstore_core::{BackendClass, FileRecord, Locator};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Backend, BackendClass, BackendPool, ByteStream, FileRecord, FileStorage, Locator,
        Outcome, StorageConfig, StorageError, StorageResult, UploadRequest,
    };
}
