//! tgstore-axum: HTTP surface for tgstore.
//!
//! Mounts the file routes under `/api/v1/files` with API-key checking,
//! request ids and request tracing.

pub mod app;
pub mod middlewares;
pub mod rest;
pub mod state;
mod error;
pub use error::{api_error, HttpError};
pub use state::AppState;

pub use app::{FilesApp, DEFAULT_BODY_LIMIT};
