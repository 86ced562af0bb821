use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use tgstore_blob::{ByteStream, MessageLocator, Payload, UploadRequest};
use tgstore_core::{ApiError, FileRecord};

use crate::{middlewares::spool_upload, AppState, HttpError};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Routes for `/api/v1/files`
pub fn files_router() -> Router<AppState> {
    Router::new()
        .route("/", routing::get(list))
        .route("/upload", routing::post(upload))
        .route("/{id}", routing::get(get).delete(remove))
        .route("/{id}/download", routing::get(download))
        .route("/download/{chat_id}/{message_id}", routing::get(download_by_message))
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<FileRecord>), HttpError> {
    let form = spool_upload(&headers, body, state.body_limit).await?;

    let mut request = UploadRequest::new(
        form.filename.clone(),
        form.size,
        Payload::File(form.file.to_path_buf()),
    );
    if let Some(caption) = form.caption.clone() {
        request = request.with_caption(caption);
    }
    if let Some(id) = headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        request = request.with_request_id(id);
    }

    // `form` owns the temp file and must outlive the upload
    let record = state.storage.upload(&request).await?;
    drop(form);

    match record {
        Some(record) => Ok((StatusCode::CREATED, Json(record))),
        None => Err(ApiError::bad_request("File could not be stored").into()),
    }
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>, HttpError> {
    Ok(Json(state.storage.list().await?))
}

async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<FileRecord>, HttpError> {
    match state.storage.get(id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::not_found(format!("No record found for id '{}'", id)).into()),
    }
}

async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<FileRecord>, HttpError> {
    match state.storage.delete(id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::bad_request(format!("No record found for id '{}'", id)).into()),
    }
}

async fn download(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, HttpError> {
    let Some(record) = state.storage.get(id).await? else {
        return Err(ApiError::not_found(format!("No record found for id '{}'", id)).into());
    };
    stream_or_decline(state.storage.download(&record).await?)
}

async fn download_by_message(
    State(state): State<AppState>,
    Path((chat_id, message_id)): Path<(i64, i32)>,
) -> Result<Response, HttpError> {
    let locator = MessageLocator::new(chat_id, message_id).to_locator();
    stream_or_decline(state.storage.download_by_locator(&locator).await?)
}

fn stream_or_decline(stream: Option<ByteStream>) -> Result<Response, HttpError> {
    let Some(stream) = stream else {
        return Err(ApiError::bad_request("File could not be retrieved").into());
    };
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}
