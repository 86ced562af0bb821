pub mod config;
pub mod janitor;

use std::sync::Arc;

use anyhow::{bail, Context};
use tgstore_axum::{AppState, FilesApp, DEFAULT_BODY_LIMIT};
use tgstore_blob::telegram::{TelegramBackend, TelegramOptions};
use tgstore_blob::{Backend, BackendClass, BackendPool, FileStorage, StorageConfig};
use tgstore_core::{MemoryMetadataStore, MetadataStore, SqliteMetadataStore};

pub use config::Settings;

const MEMORY_DATABASE: &str = "memory";

/// One Telegram backend per configured credential.
pub fn build_backends(settings: &Settings) -> anyhow::Result<Vec<Arc<dyn Backend>>> {
    let bot_tokens = settings.bot_tokens();
    let user_tokens = settings.user_tokens();
    if bot_tokens.is_empty() && user_tokens.is_empty() {
        bail!("No storage backends configured; set BOT_TOKENS and/or USER_TOKENS");
    }

    let chat_id = settings
        .telegram_chat_id
        .context("TELEGRAM_CHAT_ID is required when tokens are configured")?;
    let temp_chat_id = settings.temp_chat_id().unwrap_or(chat_id);

    let mut primary = TelegramOptions::new(chat_id).with_temp_chat(temp_chat_id);
    primary.api_url = parse_url(settings.bot_api_url.as_deref())?;

    let mut secondary = TelegramOptions::new(chat_id)
        .with_temp_chat(temp_chat_id)
        .with_local_mode(settings.user_api_local);
    secondary.api_url = parse_url(settings.user_api_url.as_deref())?;

    if !user_tokens.is_empty() && secondary.api_url.is_none() {
        tracing::warn!("USER_TOKENS set without USER_API_URL; secondary uploads use the hosted API");
    }

    let mut backends: Vec<Arc<dyn Backend>> = Vec::new();
    for (i, token) in bot_tokens.into_iter().enumerate() {
        let backend = TelegramBackend::new(format!("bot-{}", i), BackendClass::Primary, token, primary.clone())?;
        backends.push(Arc::new(backend));
    }
    for (i, token) in user_tokens.into_iter().enumerate() {
        let backend = TelegramBackend::new(format!("user-{}", i), BackendClass::Secondary, token, secondary.clone())?;
        backends.push(Arc::new(backend));
    }

    Ok(backends)
}

fn parse_url(raw: Option<&str>) -> anyhow::Result<Option<reqwest::Url>> {
    raw.filter(|url| !url.is_empty())
        .map(|url| reqwest::Url::parse(url).with_context(|| format!("Invalid API url '{}'", url)))
        .transpose()
}

/// Open the metadata store named by `database_url`.
pub async fn connect_metadata(database_url: &str) -> anyhow::Result<Arc<dyn MetadataStore>> {
    if database_url == MEMORY_DATABASE {
        tracing::warn!("Using the in-memory metadata store; records are lost on restart");
        return Ok(Arc::new(MemoryMetadataStore::new()));
    }

    let store = SqliteMetadataStore::connect(database_url)
        .await
        .with_context(|| format!("Failed to open metadata database '{}'", database_url))?;
    Ok(Arc::new(store))
}

pub fn storage_config(settings: &Settings) -> StorageConfig {
    match settings.primary_max_upload_bytes {
        Some(bytes) => StorageConfig::new().with_primary_ceiling(bytes),
        None => StorageConfig::new(),
    }
}

/// Build the HTTP app from already constructed backends.
///
/// Every backend is prepared first; a backend that cannot authenticate
/// aborts startup.
pub async fn build(settings: &Settings, backends: Vec<Arc<dyn Backend>>) -> anyhow::Result<FilesApp> {
    let pool = BackendPool::new(backends);
    if pool.is_empty() {
        bail!("No storage backends configured");
    }

    pool.prepare().await.context("Failed to prepare storage backends")?;

    let metadata = connect_metadata(&settings.database_url).await?;
    let storage = FileStorage::new(pool, metadata, storage_config(settings));

    let mut state = AppState::new(storage);
    if let Some(api_key) = &settings.api_key {
        state = state.with_api_key(api_key.clone());
    } else {
        tracing::warn!("API_KEY is not set; requests are not authenticated");
    }

    Ok(FilesApp::with_body_limit(
        state,
        settings.body_limit_bytes.unwrap_or(DEFAULT_BODY_LIMIT),
    ))
}
