//! Sweeps documents a local Bot API server leaves behind after downloads.
//!
//! Layout: `<root>/<bot>/documents/<file>`.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

const DOCUMENTS_DIR: &str = "documents";

/// Remove document files older than `max_age`. Returns how many were removed.
pub async fn sweep(root: &Path, max_age: Duration) -> io::Result<usize> {
    let mut removed = 0;
    let mut bots = tokio::fs::read_dir(root).await?;

    while let Some(bot) = bots.next_entry().await? {
        if !bot.file_type().await?.is_dir() {
            continue;
        }

        let documents = bot.path().join(DOCUMENTS_DIR);
        let mut files = match tokio::fs::read_dir(&documents).await {
            Ok(files) => files,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => {
                warn!(dir = %documents.display(), error = %err, "Cannot read documents directory");
                continue;
            }
        };

        while let Some(file) = files.next_entry().await? {
            let metadata = file.metadata().await?;
            if !metadata.is_file() || !is_expired(&metadata, max_age) {
                continue;
            }

            match tokio::fs::remove_file(file.path()).await {
                Ok(()) => {
                    debug!(file = %file.path().display(), "Removed");
                    removed += 1;
                }
                Err(err) => warn!(file = %file.path().display(), error = %err, "Failed to remove"),
            }
        }
    }

    Ok(removed)
}

fn is_expired(metadata: &std::fs::Metadata, max_age: Duration) -> bool {
    metadata
        .modified()
        .ok()
        .map(|modified| SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO))
        .map_or(false, |age| age >= max_age)
}

/// Sweep `root` every `interval` until the task is dropped.
pub async fn run(root: PathBuf, interval: Duration, max_age: Duration) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    info!(root = %root.display(), ?interval, ?max_age, "File janitor started");

    loop {
        ticker.tick().await;
        match sweep(&root, max_age).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Swept local documents"),
            Err(err) => warn!(root = %root.display(), error = %err, "Sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> (tempfile::TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let documents = root.path().join("123456:bot").join(DOCUMENTS_DIR);
        std::fs::create_dir_all(&documents).unwrap();
        std::fs::write(documents.join("file_0.pdf"), b"x").unwrap();
        std::fs::write(documents.join("file_1.pdf"), b"y").unwrap();
        std::fs::write(root.path().join("stray.txt"), b"z").unwrap();
        (root, documents)
    }

    #[tokio::test]
    async fn recent_files_are_kept() {
        let (root, documents) = layout();

        let removed = sweep(root.path(), Duration::from_secs(3600)).await.unwrap();

        assert_eq!(removed, 0);
        assert_eq!(std::fs::read_dir(&documents).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn expired_files_are_removed() {
        let (root, documents) = layout();

        let removed = sweep(root.path(), Duration::ZERO).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(std::fs::read_dir(&documents).unwrap().count(), 0);
        // Only `documents` directories are touched
        assert!(root.path().join("stray.txt").exists());
    }

    #[tokio::test]
    async fn bot_without_documents_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("empty-bot")).unwrap();

        assert_eq!(sweep(root.path(), Duration::ZERO).await.unwrap(), 0);
    }
}
