//! Video metadata table backed by SQLite.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::Video;

const CREATE_VIDEOS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        filename TEXT NOT NULL,
        upload_time TEXT NOT NULL
    )
"#;

/// Repository for the `videos` table. Each call checks a connection out of the
/// pool for its own duration only.
#[derive(Clone)]
pub struct VideoStore {
    pool: SqlitePool,
}

impl VideoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if absent) the database file at `path`.
    pub async fn connect(path: &Path, max_connections: u32) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(AppError::StorageWrite)?;
        }

        info!("Opening database at {:?}", path);
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet. Safe to call repeatedly.
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(CREATE_VIDEOS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Append a record stamped with the current time and return its id.
    #[tracing::instrument(skip(self), fields(db.table = "videos"))]
    pub async fn insert(&self, title: &str, filename: &str) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO videos (title, filename, upload_time) \
             VALUES (?, ?, strftime('%Y-%m-%d %H:%M:%f', 'now'))",
        )
        .bind(title)
        .bind(filename)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Every record, newest first. Rows sharing a timestamp come out newest id first.
    pub async fn list_all(&self) -> AppResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(
            "SELECT id, title, filename, upload_time FROM videos \
             ORDER BY upload_time DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.record_id = %id))]
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(
            "SELECT id, title, filename, upload_time FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }

    /// Stored filenames referenced by any record.
    pub async fn referenced_filenames(&self) -> AppResult<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT filename FROM videos")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, VideoStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = VideoStore::connect(&temp.path().join("videos.db"), 2)
            .await
            .unwrap();
        store.initialize().await.unwrap();
        (temp, store)
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (_temp, store) = open_store().await;
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let (_temp, store) = open_store().await;
        let first = store.insert("One", "a_one.mp4").await.unwrap();
        let second = store.insert("Two", "b_two.mp4").await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let video = store.get_by_id(second).await.unwrap().unwrap();
        assert_eq!(video.title, "Two");
        assert_eq!(video.filename, "b_two.mp4");
        assert!(!video.upload_time.is_empty());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let (_temp, store) = open_store().await;
        for (title, name) in [("A", "a.mp4"), ("B", "b.mp4"), ("C", "c.mp4")] {
            store.insert(title, name).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.title)
            .collect();
        assert_eq!(titles, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn missing_id_is_none() {
        let (_temp, store) = open_store().await;
        assert!(store.get_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn referenced_filenames_lists_every_row() {
        let (_temp, store) = open_store().await;
        store.insert("A", "a.mp4").await.unwrap();
        store.insert("B", "b.mov").await.unwrap();

        let names = store.referenced_filenames().await.unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("a.mp4"));
        assert!(names.contains("b.mov"));
    }
}
