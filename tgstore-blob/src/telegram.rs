//! Backend posting files as documents through the Telegram Bot API.
//!
//! Primary backends talk to the hosted API. Secondary backends talk to a
//! self-hosted Bot API server, which lifts the upload ceiling and, in local
//! mode, serves downloaded files straight from its working directory.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Url;
use teloxide::net::Download;
use teloxide::payloads::SendDocumentSetters;
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, InputFile, MessageId};
use teloxide::{Bot, RequestError};
use tgstore_core::{BackendClass, Locator};
use tokio::sync::OnceCell;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::{
    Backend, ByteStream, Decline, MessageLocator, Outcome, Payload, StorageError, StorageResult,
    UploadRequest,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Lowercased fragments of API error descriptions meaning the content was
/// refused, not that the bot is unusable.
const DECLINED_MARKERS: &[&str] = &[
    "file is too big",
    "wrong file",
    "request entity too large",
    "message can't be forwarded",
    "failed to get http url content",
    "wrong type of the web page content",
];

/// Where a [`TelegramBackend`] posts and how it reaches the API
#[derive(Debug, Clone)]
pub struct TelegramOptions {
    /// Chat every upload is sent to
    pub chat_id: i64,
    /// Chat used to re-read stored messages on download
    pub temp_chat_id: i64,
    /// Bot API server; the hosted one when `None`
    pub api_url: Option<Url>,
    /// The API server runs with `--local` and returns absolute file paths
    pub local_mode: bool,
}

impl TelegramOptions {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            temp_chat_id: chat_id,
            api_url: None,
            local_mode: false,
        }
    }

    pub fn with_temp_chat(mut self, temp_chat_id: i64) -> Self {
        self.temp_chat_id = temp_chat_id;
        self
    }

    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = Some(api_url);
        self
    }

    pub fn with_local_mode(mut self, local_mode: bool) -> Self {
        self.local_mode = local_mode;
        self
    }
}

pub struct TelegramBackend {
    name: String,
    class: BackendClass,
    bot: Bot,
    options: TelegramOptions,
    identity: OnceCell<String>,
}

impl TelegramBackend {
    pub fn new(
        name: impl Into<String>,
        class: BackendClass,
        token: impl Into<String>,
        options: TelegramOptions,
    ) -> StorageResult<Self> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .tcp_nodelay(true)
            .build()
            .map_err(|err| StorageError::prepare(name.clone(), err))?;

        let mut bot = Bot::with_client(token, client);
        if let Some(url) = &options.api_url {
            bot = bot.set_api_url(url.clone());
        }

        Ok(Self {
            name,
            class,
            bot,
            options,
            identity: OnceCell::new(),
        })
    }

    fn declined_or_failed<T>(&self, err: RequestError) -> StorageResult<Outcome<T>> {
        match classify(err) {
            Ok(decline) => Ok(Outcome::Declined(decline)),
            Err(err) => Err(StorageError::transport(self.class, self.name.clone(), err)),
        }
    }

    fn input_file(&self, request: &UploadRequest) -> InputFile {
        let file = match &request.payload {
            Payload::Memory(bytes) => InputFile::memory(bytes.clone()),
            Payload::File(path) => InputFile::file(path.clone()),
        };
        file.file_name(request.filename.clone())
    }

    async fn open_remote(&self, path: &str) -> std::io::Result<ByteStream> {
        if self.options.local_mode {
            let file = tokio::fs::File::open(Path::new(path)).await?;
            return Ok(Box::pin(ReaderStream::new(file)));
        }

        let stream = self
            .bot
            .download_file_stream(path)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));
        Ok(Box::pin(stream))
    }

    /// Delete the forwarded copy; the stored original is untouched.
    async fn discard(&self, message_id: MessageId) {
        if let Err(err) = self
            .bot
            .delete_message(ChatId(self.options.temp_chat_id), message_id)
            .await
        {
            warn!(backend = %self.name, error = %err, "Failed to delete forwarded copy");
        }
    }
}

#[async_trait]
impl Backend for TelegramBackend {
    fn class(&self) -> BackendClass {
        self.class
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self) -> StorageResult<()> {
        self.identity
            .get_or_try_init(|| async {
                let me = self
                    .bot
                    .get_me()
                    .await
                    .map_err(|err| StorageError::prepare(self.name.clone(), err))?;
                debug!(backend = %self.name, username = ?me.username, "Bot authenticated");
                Ok::<_, StorageError>(me.username.clone().unwrap_or_default())
            })
            .await?;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.identity.initialized()
    }

    async fn upload(&self, request: &UploadRequest) -> StorageResult<Outcome<Locator>> {
        let document = self.input_file(request);
        let mut send = self.bot.send_document(ChatId(self.options.chat_id), document);
        if let Some(caption) = &request.caption {
            send = send.caption(caption.clone());
        }

        match send.await {
            Ok(message) => {
                let locator = MessageLocator::new(message.chat.id.0, message.id.0);
                Ok(Outcome::Done(locator.to_locator()))
            }
            Err(err) => self.declined_or_failed(err),
        }
    }

    async fn download(&self, locator: &Locator) -> StorageResult<Outcome<ByteStream>> {
        let Some(target) = MessageLocator::from_locator(locator) else {
            return Ok(Outcome::Declined(Decline::Unrecognized));
        };

        let forwarded = match self
            .bot
            .forward_message(
                ChatId(self.options.temp_chat_id),
                ChatId(target.chat_id),
                MessageId(target.message_id),
            )
            .await
        {
            Ok(message) => message,
            Err(err) => return self.declined_or_failed(err),
        };

        let file_id = forwarded.document().map(|document| document.file.id.clone());
        let Some(file_id) = file_id else {
            self.discard(forwarded.id).await;
            return Ok(Outcome::Declined(Decline::NoContent));
        };

        let file = self.bot.get_file(file_id).await;
        self.discard(forwarded.id).await;

        let file = match file {
            Ok(file) => file,
            Err(err) => return self.declined_or_failed(err),
        };

        Ok(Outcome::Done(self.open_remote(&file.path).await?))
    }
}

/// Split API failures into declined content and transport errors.
fn classify(err: RequestError) -> Result<Decline, RequestError> {
    let RequestError::Api(api) = &err else {
        return Err(err);
    };

    if matches!(api, teloxide::ApiError::MessageToForwardNotFound) {
        return Ok(Decline::NotFound);
    }

    let description = api.to_string().to_lowercase();
    if DECLINED_MARKERS.iter().any(|marker| description.contains(marker)) {
        return Ok(Decline::Rejected(api.to_string()));
    }

    Err(err)
}
