use std::sync::Arc;

use tgstore_blob::FileStorage;

use crate::DEFAULT_BODY_LIMIT;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<FileStorage>,
    /// Expected `Authorization` header value; `None` disables the check.
    pub api_key: Option<Arc<str>>,
    /// Largest upload body in bytes.
    pub body_limit: u64,
}

impl AppState {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage: Arc::new(storage),
            api_key: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key: String = api_key.into();
        self.api_key = if api_key.is_empty() { None } else { Some(api_key.into()) };
        self
    }
}
