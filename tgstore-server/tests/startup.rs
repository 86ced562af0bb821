use std::sync::Arc;

use tgstore_blob::memory::{MemoryBackend, MemoryChannel};
use tgstore_blob::{Backend, BackendClass};
use tgstore_server::{build, build_backends, storage_config, Settings};

fn settings(database_url: &str) -> Settings {
    Settings {
        api_key: Some("key".to_string()),
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: database_url.to_string(),
        telegram_chat_id: Some(-100),
        telegram_temp_chat_id: None,
        bot_tokens_str: None,
        bot_api_url: None,
        user_tokens_str: None,
        user_api_url: None,
        user_api_local: false,
        primary_max_upload_bytes: Some(1024),
        body_limit_bytes: None,
        local_files_dir: None,
        janitor_interval_secs: 300,
        janitor_max_age_secs: 3600,
    }
}

#[test]
fn no_tokens_refuses_to_start() {
    let err = build_backends(&settings("memory")).err().unwrap();
    assert!(err.to_string().contains("No storage backends"));
}

#[test]
fn tokens_without_chat_are_rejected() {
    let mut s = settings("memory");
    s.bot_tokens_str = Some("1:a".to_string());
    s.telegram_chat_id = None;

    assert!(build_backends(&s).is_err());
}

#[test]
fn one_backend_per_token() {
    let mut s = settings("memory");
    s.bot_tokens_str = Some(r#"["1:a","2:b"]"#.to_string());
    s.user_tokens_str = Some("3:c".to_string());
    s.user_api_url = Some("http://localhost:8081".to_string());

    let backends = build_backends(&s).unwrap();

    let classes: Vec<_> = backends.iter().map(|b| b.class()).collect();
    assert_eq!(classes, vec![BackendClass::Primary, BackendClass::Primary, BackendClass::Secondary]);
    assert!(backends.iter().all(|b| !b.is_ready()));
}

#[test]
fn invalid_api_url_is_rejected() {
    let mut s = settings("memory");
    s.bot_tokens_str = Some("1:a".to_string());
    s.bot_api_url = Some("not a url".to_string());

    assert!(build_backends(&s).is_err());
}

#[test]
fn primary_ceiling_comes_from_settings() {
    let config = storage_config(&settings("memory"));
    assert_eq!(config.ceiling(BackendClass::Primary), Some(1024));
    assert_eq!(config.ceiling(BackendClass::Secondary), None);
}

#[tokio::test]
async fn build_prepares_backends() {
    let backend = Arc::new(MemoryBackend::new("bot-0", BackendClass::Primary, MemoryChannel::new(-100)));

    let app = build(&settings("sqlite::memory:"), vec![backend.clone() as Arc<dyn Backend>])
        .await
        .unwrap();

    assert!(backend.is_ready());
    assert!(app.state.storage.pool().is_ready());
    assert_eq!(app.state.storage.config().ceiling(BackendClass::Primary), Some(1024));
}

#[tokio::test]
async fn build_fails_when_a_backend_cannot_prepare() {
    let backend = MemoryBackend::new("bot-0", BackendClass::Primary, MemoryChannel::new(-100)).failing_prepare();

    let result = build(&settings("memory"), vec![Arc::new(backend) as Arc<dyn Backend>]).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn build_without_backends_fails() {
    assert!(build(&settings("memory"), Vec::new()).await.is_err());
}
