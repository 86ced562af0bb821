use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BackendClass, Locator};

/// A stored file: which backend class holds it and where.
///
/// Created once after a successful upload, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub backend: BackendClass,
    pub data: Locator,
    pub upload_time: DateTime<Utc>,
}

/// Input for [`crate::MetadataStore::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewFileRecord {
    pub backend: BackendClass,
    pub data: Locator,
}

impl NewFileRecord {
    pub fn new(backend: BackendClass, data: Locator) -> Self {
        Self { backend, data }
    }
}
