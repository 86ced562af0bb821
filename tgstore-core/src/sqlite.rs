//! SQLite-backed metadata store.
//!
//! Schema is versioned through a `migrations` table; each pending migration
//! runs in its own transaction.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Row, SqlitePool};

use crate::{FileRecord, Locator, MetadataError, MetadataResult, MetadataStore, NewFileRecord};

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    r#"
    CREATE TABLE IF NOT EXISTS uploaded_files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        backend TEXT NOT NULL CHECK (backend IN ('bot', 'user')),
        data TEXT NOT NULL,
        upload_time TEXT NOT NULL
    )
    "#,
)];

#[derive(FromRow)]
struct FileRow {
    id: i64,
    backend: String,
    data: Json<Locator>,
    upload_time: DateTime<Utc>,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = MetadataError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let backend = row
            .backend
            .parse()
            .map_err(|e| MetadataError::corrupt(row.id, e))?;

        Ok(FileRecord {
            id: row.id,
            backend,
            data: row.data.0,
            upload_time: row.upload_time,
        })
    }
}

/// Metadata store on a SQLite database
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Open (creating if missing) the database at `url` and apply migrations.
    ///
    /// `sqlite::memory:` gets a single connection so every query sees the
    /// same database.
    pub async fn connect(url: &str) -> MetadataResult<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Call [`SqliteMetadataStore::migrate`] before use.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let current: i64 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
            .fetch_one(&self.pool)
            .await?
            .get(0);

        for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            let mut tx = self.pool.begin().await?;

            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| MetadataError::Migration { version: *version, source })?;

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            tracing::info!(version, "Applied metadata migration");
        }

        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create(&self, record: NewFileRecord) -> MetadataResult<FileRecord> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO uploaded_files (backend, data, upload_time)
            VALUES (?, ?, ?)
            RETURNING id, backend, data, upload_time
            "#,
        )
        .bind(record.backend.as_str())
        .bind(Json(&record.data))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id = row.id, backend = %row.backend, "Created file record");
        row.try_into()
    }

    async fn get(&self, id: i64) -> MetadataResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRow>(
            "SELECT id, backend, data, upload_time FROM uploaded_files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(FileRecord::try_from)
        .transpose()
    }

    async fn list(&self) -> MetadataResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRow>(
            "SELECT id, backend, data, upload_time FROM uploaded_files ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(FileRecord::try_from)
        .collect()
    }

    async fn delete(&self, id: i64) -> MetadataResult<Option<FileRecord>> {
        let deleted = sqlx::query_as::<_, FileRow>(
            "DELETE FROM uploaded_files WHERE id = ? RETURNING id, backend, data, upload_time",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if deleted.is_some() {
            tracing::debug!(id, "Deleted file record");
        }
        deleted.map(FileRecord::try_from).transpose()
    }
}
