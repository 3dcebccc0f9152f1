//! SQLite-backed store for generated image metadata.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub type ImageId = i64;

const COLUMNS: &str = "id, prompt, model_name, filename, created_at, file_size";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: ImageId,
    pub prompt: String,
    pub model_name: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub file_size: i64,
}

#[derive(Debug, Clone)]
pub struct NewImageRecord {
    pub prompt: String,
    pub model_name: String,
    pub filename: String,
    pub file_size: i64,
}

/// One page of records, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePage {
    pub items: Vec<ImageRecord>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}

impl ImagePage {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

#[derive(Clone, Debug)]
pub struct ImageRecordStore {
    pool: SqlitePool,
}

impl ImageRecordStore {
    /// Opens (creating if missing) the database at `database_url` and applies
    /// pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Single-connection in-memory database. The connection is pinned so the
    /// data outlives idle periods.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn create(&self, input: &NewImageRecord) -> Result<ImageRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_images (prompt, model_name, filename, created_at, file_size)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImageRecord>(&query)
            .bind(&input.prompt)
            .bind(&input.model_name)
            .bind(&input.filename)
            .bind(Utc::now())
            .bind(input.file_size)
            .fetch_one(&self.pool)
            .await
    }

    /// Pages are 1-based; out-of-range pages come back empty.
    pub async fn list(&self, page: i64, per_page: i64) -> Result<ImagePage, sqlx::Error> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM generated_images")
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM generated_images
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        );
        let items = sqlx::query_as::<_, ImageRecord>(&query)
            .bind(per_page)
            .bind((page - 1).saturating_mul(per_page))
            .fetch_all(&self.pool)
            .await?;

        Ok(ImagePage {
            items,
            total,
            page,
            per_page,
            pages: if total == 0 { 0 } else { (total - 1) / per_page + 1 },
        })
    }

    pub async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generated_images WHERE id = ?");
        sqlx::query_as::<_, ImageRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Removes the row and returns it, or `None` if it did not exist.
    pub async fn delete(&self, id: ImageId) -> Result<Option<ImageRecord>, sqlx::Error> {
        let query = format!("DELETE FROM generated_images WHERE id = ? RETURNING {COLUMNS}");
        sqlx::query_as::<_, ImageRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}
