use tgstore_core::BackendClass;

/// Historical Bot API upload limit, in decimal megabytes.
pub const DEFAULT_PRIMARY_MAX_UPLOAD_BYTES: u64 = 50 * 1000 * 1000;

/// Configuration for storage routing
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Largest payload offered to a Primary backend
    pub primary_max_upload_bytes: Option<u64>,

    /// Largest payload offered to a Secondary backend
    pub secondary_max_upload_bytes: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            primary_max_upload_bytes: Some(DEFAULT_PRIMARY_MAX_UPLOAD_BYTES),
            secondary_max_upload_bytes: None,
        }
    }
}

impl StorageConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Primary class ceiling
    pub fn with_primary_ceiling(mut self, bytes: u64) -> Self {
        self.primary_max_upload_bytes = Some(bytes);
        self
    }

    /// Set the Secondary class ceiling
    pub fn with_secondary_ceiling(mut self, bytes: u64) -> Self {
        self.secondary_max_upload_bytes = Some(bytes);
        self
    }

    /// Ceiling for a class, `None` when unlimited
    pub fn ceiling(&self, class: BackendClass) -> Option<u64> {
        match class {
            BackendClass::Primary => self.primary_max_upload_bytes,
            BackendClass::Secondary => self.secondary_max_upload_bytes,
        }
    }
}
