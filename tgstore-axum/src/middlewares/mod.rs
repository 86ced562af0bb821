mod auth;
mod multipart;

pub use auth::require_api_key;
pub use multipart::{spool_upload, SpooledUpload};
