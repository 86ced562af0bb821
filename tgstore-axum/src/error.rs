use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tgstore_blob::StorageError;
use tgstore_core::ApiError;

#[derive(Debug)]
pub struct HttpError(pub anyhow::Error);

impl From<anyhow::Error> for HttpError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<ApiError> for HttpError {
    fn from(e: ApiError) -> Self {
        Self(anyhow::Error::new(e))
    }
}

impl From<StorageError> for HttpError {
    fn from(e: StorageError) -> Self {
        api_error(e).into()
    }
}

/// Client-facing error for a storage failure.
///
/// Missing storage is the caller's problem (400); a backend that cannot be
/// reached is upstream's (502).
pub fn api_error(err: StorageError) -> ApiError {
    match err {
        StorageError::Unavailable | StorageError::NoBackendAvailable { .. } => {
            ApiError::bad_request(err.to_string()).with_source(err)
        }
        StorageError::NotReady | StorageError::Prepare { .. } => {
            ApiError::unavailable("Storage is starting up").with_source(err)
        }
        StorageError::Transport { .. } => {
            ApiError::bad_gateway("Storage backend failed").with_source(err)
        }
        StorageError::Metadata(_) | StorageError::Io(_) => {
            ApiError::general_error("Internal storage error").with_source(err)
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let api = match self.0.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
            Some(api) => api.sanitize_for_client(),
            None => ApiError::general_error(self.0.to_string()),
        };

        let status = StatusCode::from_u16(api.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = ?self.0, code = api.code(), "Request failed");
        }
        (status, Json(api.to_json())).into_response()
    }
}
