use std::io::Write;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use tgstore_blob::memory::{MemoryBackend, MemoryChannel, MemoryMode};
use tgstore_blob::{
    Backend, BackendClass, BackendPool, ByteStream, FileStorage, MessageLocator, Payload,
    StorageConfig, StorageError, UploadRequest, DEFAULT_PRIMARY_MAX_UPLOAD_BYTES,
};
use tgstore_core::{MemoryMetadataStore, MetadataStore};

const CHAT_ID: i64 = -100_123;

/// Test fixture: one shared chat, any number of backends per class
struct Fixture {
    channel: MemoryChannel,
    primary: Vec<Arc<MemoryBackend>>,
    secondary: Vec<Arc<MemoryBackend>>,
    metadata: Arc<MemoryMetadataStore>,
    storage: FileStorage,
}

async fn fixture(primary: usize, secondary: usize) -> Fixture {
    fixture_with(primary, secondary, StorageConfig::default()).await
}

async fn fixture_with(primary: usize, secondary: usize, config: StorageConfig) -> Fixture {
    let channel = MemoryChannel::new(CHAT_ID);
    let primary: Vec<_> = (0..primary)
        .map(|i| Arc::new(MemoryBackend::new(format!("bot-{}", i), BackendClass::Primary, channel.clone())))
        .collect();
    let secondary: Vec<_> = (0..secondary)
        .map(|i| Arc::new(MemoryBackend::new(format!("user-{}", i), BackendClass::Secondary, channel.clone())))
        .collect();

    let pool = BackendPool::new(
        primary
            .iter()
            .chain(secondary.iter())
            .map(|b| Arc::clone(b) as Arc<dyn Backend>),
    );
    let metadata = Arc::new(MemoryMetadataStore::new());
    let storage = FileStorage::new(pool, metadata.clone(), config);
    storage.prepare().await.unwrap();

    Fixture {
        channel,
        primary,
        secondary,
        metadata,
        storage,
    }
}

async fn collect(mut stream: ByteStream) -> Bytes {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.unwrap());
    }
    buf.freeze()
}

fn kilobyte() -> UploadRequest {
    UploadRequest::from_bytes("small.bin", vec![7u8; 1024])
}

#[tokio::test]
async fn small_file_is_stored_on_primary() {
    let fx = fixture(1, 1).await;

    let record = fx.storage.upload(&kilobyte()).await.unwrap().unwrap();

    assert_eq!(record.backend, BackendClass::Primary);
    assert_eq!(fx.primary[0].upload_calls(), 1);
    assert_eq!(fx.secondary[0].upload_calls(), 0);
    assert_eq!(fx.metadata.len(), 1);
}

#[tokio::test]
async fn file_over_primary_ceiling_is_stored_on_secondary() {
    let fx = fixture(1, 1).await;
    let size = 60 * 1000 * 1000;
    assert!(size as u64 > DEFAULT_PRIMARY_MAX_UPLOAD_BYTES);

    let request = UploadRequest::from_bytes("large.bin", vec![1u8; size]);
    let record = fx.storage.upload(&request).await.unwrap().unwrap();

    assert_eq!(record.backend, BackendClass::Secondary);
    // The ceiling is checked before any call
    assert_eq!(fx.primary[0].upload_calls(), 0);
}

#[tokio::test]
async fn empty_pool_is_unavailable_and_stores_nothing() {
    let fx = fixture(0, 0).await;

    let result = fx.storage.upload(&kilobyte()).await;

    assert!(matches!(result, Err(StorageError::Unavailable)));
    assert!(fx.metadata.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn only_secondary_configured_stores_on_secondary() {
    let fx = fixture(0, 1).await;

    let record = fx.storage.upload(&kilobyte()).await.unwrap().unwrap();

    assert_eq!(record.backend, BackendClass::Secondary);
}

#[tokio::test]
async fn declined_primary_falls_back_to_secondary() {
    let fx = fixture(1, 1).await;
    fx.primary[0].set_mode(MemoryMode::Decline);

    let record = fx.storage.upload(&kilobyte()).await.unwrap().unwrap();

    assert_eq!(record.backend, BackendClass::Secondary);
    assert_eq!(fx.primary[0].upload_calls(), 1);
    assert_eq!(fx.secondary[0].upload_calls(), 1);
}

#[tokio::test]
async fn both_classes_declining_is_no_result() {
    let fx = fixture(1, 1).await;
    fx.primary[0].set_mode(MemoryMode::Decline);
    fx.secondary[0].set_mode(MemoryMode::Decline);

    let result = fx.storage.upload(&kilobyte()).await.unwrap();

    assert!(result.is_none());
    assert_eq!(fx.metadata.len(), 0);
}

#[tokio::test]
async fn primary_transport_error_is_not_masked_by_fallback() {
    let fx = fixture(1, 1).await;
    fx.primary[0].set_mode(MemoryMode::Fail);

    let result = fx.storage.upload(&kilobyte()).await;

    assert!(matches!(
        result,
        Err(StorageError::Transport { class: BackendClass::Primary, .. })
    ));
    assert_eq!(fx.secondary[0].upload_calls(), 0);
    assert_eq!(fx.metadata.len(), 0);
}

#[tokio::test]
async fn uploads_rotate_across_primary_backends() {
    let fx = fixture(3, 0).await;

    for _ in 0..6 {
        fx.storage.upload(&kilobyte()).await.unwrap().unwrap();
    }

    for backend in &fx.primary {
        assert_eq!(backend.upload_calls(), 2, "{}", backend.name());
    }
}

#[tokio::test]
async fn round_trip_is_byte_identical() {
    let fx = fixture(2, 1).await;
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let request = UploadRequest::from_bytes("pattern.bin", content.clone()).with_caption("pattern");
    let record = fx.storage.upload(&request).await.unwrap().unwrap();

    // Any backend of the class can serve it
    let stream = fx.storage.download(&record).await.unwrap().unwrap();
    assert_eq!(collect(stream).await, Bytes::from(content));
}

#[tokio::test]
async fn spooled_payload_round_trips() {
    let fx = fixture(1, 0).await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"spooled content").unwrap();

    let request = UploadRequest::new("spooled.txt", 15, Payload::File(file.path().to_path_buf()));
    let record = fx.storage.upload(&request).await.unwrap().unwrap();

    let stream = fx.storage.download(&record).await.unwrap().unwrap();
    assert_eq!(collect(stream).await, Bytes::from_static(b"spooled content"));
}

#[tokio::test]
async fn locator_download_tries_primary_first() {
    let fx = fixture(1, 1).await;
    fx.primary[0].set_mode(MemoryMode::Decline);
    let record = fx.storage.upload(&kilobyte()).await.unwrap().unwrap();
    assert_eq!(record.backend, BackendClass::Secondary);

    let stream = fx.storage.download_by_locator(&record.data).await.unwrap().unwrap();

    assert_eq!(collect(stream).await.len(), 1024);
    assert_eq!(fx.primary[0].download_calls(), 1);
}

#[tokio::test]
async fn locator_download_of_missing_message_is_no_result() {
    let fx = fixture(1, 1).await;
    let missing = MessageLocator::new(CHAT_ID, 9_999).to_locator();

    assert!(fx.storage.download_by_locator(&missing).await.unwrap().is_none());
    assert_eq!(fx.primary[0].download_calls(), 1);
    assert_eq!(fx.secondary[0].download_calls(), 1);
}

#[tokio::test]
async fn message_without_file_is_no_result() {
    let fx = fixture(1, 0).await;
    let text = fx.channel.post_text("just text").to_locator();

    assert!(fx.storage.download_by_locator(&text).await.unwrap().is_none());
}

#[tokio::test]
async fn record_of_unconfigured_class_is_no_result() {
    let writer = fixture(0, 1).await;
    let record = writer.storage.upload(&kilobyte()).await.unwrap().unwrap();

    let reader = fixture(1, 0).await;
    assert!(reader.storage.download(&record).await.unwrap().is_none());
    assert_eq!(reader.primary[0].download_calls(), 0);
}

#[tokio::test]
async fn locator_download_with_empty_pool_is_unavailable() {
    let fx = fixture(0, 0).await;
    let locator = MessageLocator::new(CHAT_ID, 1).to_locator();

    assert!(matches!(
        fx.storage.download_by_locator(&locator).await,
        Err(StorageError::Unavailable)
    ));
}

#[tokio::test]
async fn delete_then_get_is_absent() {
    let fx = fixture(1, 0).await;
    let record = fx.storage.upload(&kilobyte()).await.unwrap().unwrap();

    let deleted = fx.storage.delete(record.id).await.unwrap().unwrap();
    assert_eq!(deleted.id, record.id);

    assert!(fx.storage.get(record.id).await.unwrap().is_none());
    assert!(fx.storage.delete(record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn custom_primary_ceiling_is_honoured() {
    let fx = fixture_with(1, 1, StorageConfig::new().with_primary_ceiling(512)).await;

    let record = fx.storage.upload(&kilobyte()).await.unwrap().unwrap();

    assert_eq!(record.backend, BackendClass::Secondary);
}
