use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap},
};
use multer::{Constraints, SizeLimit};
use tempfile::TempPath;
use tgstore_core::ApiError;
use tokio::io::AsyncWriteExt;

const FILE_FIELD: &str = "file";
const FILENAME_FIELD: &str = "filename";
const CAPTION_FIELD: &str = "caption";
const DEFAULT_FILENAME: &str = "file";

/// Upload form with the file part spooled to disk.
///
/// The temp file is removed when this value is dropped.
#[derive(Debug)]
pub struct SpooledUpload {
    pub file: TempPath,
    pub filename: String,
    pub caption: Option<String>,
    pub size: u64,
}

/// Stream a `multipart/form-data` body into a [`SpooledUpload`].
///
/// Fields: `file` (required), `filename` (overrides the part's file name),
/// `caption`. Unknown fields are ignored. The file part is written chunk by
/// chunk and never held in memory whole. A body longer than `limit` bytes
/// is rejected with 413 and its partial spool removed.
pub async fn spool_upload(headers: &HeaderMap, body: Body, limit: u64) -> Result<SpooledUpload, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| ApiError::bad_request("Expected a multipart/form-data body"))?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    let mut multipart = multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut spooled: Option<(TempPath, Option<String>, u64)> = None;
    let mut filename = None;
    let mut caption = None;

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let part_name = field.file_name().map(str::to_string);
                let path = tempfile::NamedTempFile::new()
                    .map_err(|e| ApiError::general_error("Failed to spool upload").with_source(e))?
                    .into_temp_path();
                let mut file = tokio::fs::File::create(&path)
                    .await
                    .map_err(|e| ApiError::general_error("Failed to spool upload").with_source(e))?;

                let mut size = 0u64;
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    file.write_all(&chunk)
                        .await
                        .map_err(|e| ApiError::general_error("Failed to spool upload").with_source(e))?;
                    size += chunk.len() as u64;
                }
                file.flush()
                    .await
                    .map_err(|e| ApiError::general_error("Failed to spool upload").with_source(e))?;

                tracing::debug!(size, "File part spooled");
                spooled = Some((path, part_name, size));
            }
            Some(FILENAME_FIELD) => filename = Some(field.text().await.map_err(malformed)?),
            Some(CAPTION_FIELD) => caption = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    let Some((file, part_name, size)) = spooled else {
        return Err(ApiError::bad_request("Missing `file` field"));
    };

    let filename = filename
        .filter(|name| !name.is_empty())
        .or(part_name.filter(|name| !name.is_empty()))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    Ok(SpooledUpload {
        file,
        filename,
        caption: caption.filter(|c| !c.is_empty()),
        size,
    })
}

fn malformed(err: multer::Error) -> ApiError {
    if let multer::Error::StreamSizeExceeded { limit } | multer::Error::FieldSizeExceeded { limit, .. } = err {
        return ApiError::payload_too_large(format!("Request body exceeds {} bytes", limit)).with_source(err);
    }
    ApiError::bad_request(format!("Failed to parse multipart data: {}", err)).with_source(err)
}
