use thiserror::Error;
use tgstore_core::{BackendClass, MetadataError};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while routing uploads and downloads.
///
/// "No result" is not an error; routers report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No file storage configured")]
    Unavailable,

    #[error("No {class} backend available")]
    NoBackendAvailable { class: BackendClass },

    #[error("Storage backends are not prepared yet")]
    NotReady,

    #[error("Backend {backend} failed to prepare: {source}")]
    Prepare {
        backend: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Backend {backend} ({class}) transport error: {source}")]
    Transport {
        class: BackendClass,
        backend: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Create a transport error from any error type
    pub fn transport<E>(class: BackendClass, backend: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            class,
            backend: backend.into(),
            source: Box::new(error),
        }
    }

    /// Create a prepare error from any error type
    pub fn prepare<E>(backend: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Prepare {
            backend: backend.into(),
            source: Box::new(error),
        }
    }
}
