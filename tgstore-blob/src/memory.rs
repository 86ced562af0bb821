//! In-process backend for tests and local development.
//!
//! Backends built on the same [`MemoryChannel`] share one "chat", the way
//! every account of a deployment posts to the same target.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tgstore_core::{BackendClass, Locator};

use crate::{
    Backend, ByteStream, Decline, MessageLocator, Outcome, StorageError, StorageResult,
    UploadRequest,
};

const CHUNK_SIZE: usize = 64 * 1024;

/// A message posted to a [`MemoryChannel`]
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub filename: Option<String>,
    pub caption: Option<String>,
    pub content: Option<Bytes>,
}

/// Shared in-memory chat
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    chat_id: i64,
    messages: Arc<RwLock<BTreeMap<i32, StoredMessage>>>,
    next_message_id: Arc<AtomicI32>,
}

impl MemoryChannel {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            messages: Arc::new(RwLock::new(BTreeMap::new())),
            next_message_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    fn post(&self, message: StoredMessage) -> MessageLocator {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.messages.write().insert(message_id, message);
        MessageLocator::new(self.chat_id, message_id)
    }

    /// Post a message without a file
    pub fn post_text(&self, text: &str) -> MessageLocator {
        self.post(StoredMessage {
            filename: None,
            caption: Some(text.to_string()),
            content: None,
        })
    }

    pub fn message(&self, message_id: i32) -> Option<StoredMessage> {
        self.messages.read().get(&message_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

/// How a [`MemoryBackend`] answers uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMode {
    Accept,
    /// Refuse every upload as unsupported content
    Decline,
    /// Fail every upload as if the connection dropped
    Fail,
}

/// Backend storing files in a [`MemoryChannel`]
pub struct MemoryBackend {
    name: String,
    class: BackendClass,
    channel: MemoryChannel,
    mode: RwLock<MemoryMode>,
    ready: AtomicBool,
    prepare_fails: bool,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new<S: Into<String>>(name: S, class: BackendClass, channel: MemoryChannel) -> Self {
        Self {
            name: name.into(),
            class,
            channel,
            mode: RwLock::new(MemoryMode::Accept),
            ready: AtomicBool::new(false),
            prepare_fails: false,
            uploads: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn declining(self) -> Self {
        self.set_mode(MemoryMode::Decline);
        self
    }

    pub fn failing(self) -> Self {
        self.set_mode(MemoryMode::Fail);
        self
    }

    /// Make `prepare` fail, as with a revoked credential
    pub fn failing_prepare(mut self) -> Self {
        self.prepare_fails = true;
        self
    }

    pub fn set_mode(&self, mode: MemoryMode) {
        *self.mode.write() = mode;
    }

    pub fn channel(&self) -> &MemoryChannel {
        &self.channel
    }

    /// Upload calls that reached this backend
    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Download calls that reached this backend
    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn class(&self) -> BackendClass {
        self.class
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self) -> StorageResult<()> {
        if self.prepare_fails {
            return Err(StorageError::prepare(
                self.name.clone(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "session rejected"),
            ));
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn upload(&self, request: &UploadRequest) -> StorageResult<Outcome<Locator>> {
        self.uploads.fetch_add(1, Ordering::SeqCst);

        let mode = *self.mode.read();
        match mode {
            MemoryMode::Decline => {
                return Ok(Outcome::Declined(Decline::Rejected(
                    "content type not accepted".to_string(),
                )))
            }
            MemoryMode::Fail => {
                return Err(StorageError::transport(
                    self.class,
                    self.name.clone(),
                    std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
                ))
            }
            MemoryMode::Accept => {}
        }

        let content = request.payload.read_all().await?;
        let posted = self.channel.post(StoredMessage {
            filename: Some(request.filename.clone()),
            caption: request.caption.clone(),
            content: Some(content),
        });

        Ok(Outcome::Done(posted.to_locator()))
    }

    async fn download(&self, locator: &Locator) -> StorageResult<Outcome<ByteStream>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let Some(target) = MessageLocator::from_locator(locator) else {
            return Ok(Outcome::Declined(Decline::Unrecognized));
        };
        if target.chat_id != self.channel.chat_id {
            return Ok(Outcome::Declined(Decline::NotFound));
        }

        let Some(message) = self.channel.message(target.message_id) else {
            return Ok(Outcome::Declined(Decline::NotFound));
        };
        let Some(content) = message.content else {
            return Ok(Outcome::Declined(Decline::NoContent));
        };

        let stream = async_stream::stream! {
            let mut offset = 0;
            while offset < content.len() {
                let end = (offset + CHUNK_SIZE).min(content.len());
                yield Ok::<Bytes, std::io::Error>(content.slice(offset..end));
                offset = end;
            }
        };

        Ok(Outcome::Done(Box::pin(stream)))
    }
}
