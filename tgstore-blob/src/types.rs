use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use tgstore_core::Locator;
use uuid::Uuid;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Re-readable upload body.
///
/// The upload router may offer the same payload to more than one backend
/// class, so a one-shot stream is not enough.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Content held in memory
    Memory(Bytes),
    /// Content spooled to a local file
    File(PathBuf),
}

impl Payload {
    /// Read the whole content. Only for backends that cannot stream.
    pub async fn read_all(&self) -> std::io::Result<Bytes> {
        match self {
            Payload::Memory(bytes) => Ok(bytes.clone()),
            Payload::File(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }
}

/// Request to store one file
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub caption: Option<String>,
    /// Declared size in bytes; checked against class ceilings before any call.
    pub size: u64,
    pub payload: Payload,
    pub request_id: String,
}

impl UploadRequest {
    pub fn new<S: Into<String>>(filename: S, size: u64, payload: Payload) -> Self {
        Self {
            filename: filename.into(),
            caption: None,
            size,
            payload,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// In-memory request; the size is taken from the content.
    pub fn from_bytes<S: Into<String>, B: Into<Bytes>>(filename: S, bytes: B) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(filename, size, Payload::Memory(bytes))
    }

    pub fn with_caption<S: Into<String>>(mut self, caption: S) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// Address of a message in a chat, the locator shape of chat-based backends.
///
/// Field names match the rows written by earlier deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLocator {
    pub chat_id: i64,
    pub message_id: i32,
}

impl MessageLocator {
    pub fn new(chat_id: i64, message_id: i32) -> Self {
        Self { chat_id, message_id }
    }

    pub fn to_locator(&self) -> Locator {
        let mut fields = serde_json::Map::new();
        fields.insert("chat_id".to_string(), self.chat_id.into());
        fields.insert("message_id".to_string(), self.message_id.into());
        Locator::new(fields)
    }

    /// `None` when the locator was written by a different kind of backend.
    pub fn from_locator(locator: &Locator) -> Option<Self> {
        locator.to_typed().ok()
    }
}

/// Result of a backend call that reached the platform.
///
/// Transport failures are not an outcome; they travel as `Err`.
#[derive(Debug)]
pub enum Outcome<T> {
    Done(T),
    Declined(Decline),
}

/// Why a backend produced no result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decline {
    /// Payload exceeds the class ceiling; the backend was not called.
    TooLarge { size: u64, ceiling: u64 },
    /// The platform refused the content.
    Rejected(String),
    /// No message at the locator.
    NotFound,
    /// The message exists but carries no retrievable file.
    NoContent,
    /// The locator was not produced by this kind of backend.
    Unrecognized,
}

impl fmt::Display for Decline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decline::TooLarge { size, ceiling } => {
                write!(f, "payload of {} bytes exceeds ceiling of {} bytes", size, ceiling)
            }
            Decline::Rejected(reason) => write!(f, "content rejected: {}", reason),
            Decline::NotFound => f.write_str("message not found"),
            Decline::NoContent => f.write_str("message has no file"),
            Decline::Unrecognized => f.write_str("locator not recognized"),
        }
    }
}
