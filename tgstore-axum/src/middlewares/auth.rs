use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tgstore_core::ApiError;

use crate::{AppState, HttpError};

/// Reject requests whose `Authorization` header is not the configured key.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if provided != Some(expected) {
        tracing::debug!(uri = %req.uri(), "Rejected request without a valid API key");
        return HttpError::from(ApiError::not_authenticated("Invalid API key")).into_response();
    }

    next.run(req).await
}
