#![cfg(test)]

use std::sync::Arc;

use crate::app::create_app;
use crate::config::{Config, StoreConfig};
use crate::database::{create_pool, init_media_store, DbPool, SqliteMediaStore};
use crate::store::{Collection, MediaStore};
use axum::Router;
use tempfile::TempDir;

/// A writable SQLite media store living in a temporary directory.
pub struct TestStore {
    pub pool: DbPool,
    _dir: TempDir,
}

impl TestStore {
    pub fn gateway(&self) -> Arc<dyn MediaStore> {
        Arc::new(SqliteMediaStore::new(self.pool.clone()))
    }
}

/// Create a media store with the `images` and `videos` tables and no rows
pub fn create_test_store() -> TestStore {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = StoreConfig {
        database_path: dir.path().join("media.sqlite"),
        max_connections: 4,
        read_only: false,
        busy_timeout_ms: 2000,
    };

    let pool = create_pool(&config).expect("Failed to create test store pool");
    let conn = pool.get().expect("Failed to get connection from pool");
    init_media_store(&conn).expect("Failed to initialize test store schema");

    TestStore { pool, _dir: dir }
}

/// Create a test app over a fresh store, with zero retry delay
pub fn create_test_app() -> (Router, TestStore) {
    let store = create_test_store();
    let mut config = Config::default();
    config.retry.base_delay_ms = 0;
    let app = create_app(Arc::new(config), store.gateway());
    (app, store)
}

/// Row to insert into one of the collections.
#[derive(Debug, Clone)]
pub struct TestMedia {
    pub id: i64,
    pub name: String,
    pub date_taken: i64,
    pub mime_type: Option<String>,
    pub size: i64,
    pub bucket: Option<(String, String)>,
}

impl TestMedia {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            date_taken: id * 1_000,
            mime_type: None,
            size: 1024,
            bucket: None,
        }
    }

    pub fn taken_at(mut self, date_taken: i64) -> Self {
        self.date_taken = date_taken;
        self
    }

    pub fn size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    pub fn mime(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn bucket(mut self, id: &str, name: &str) -> Self {
        self.bucket = Some((id.to_string(), name.to_string()));
        self
    }
}

pub fn insert_image(store: &TestStore, media: TestMedia) {
    insert_media(store, Collection::Images, media, "image/jpeg");
}

pub fn insert_video(store: &TestStore, media: TestMedia) {
    insert_media(store, Collection::Videos, media, "video/mp4");
}

fn insert_media(store: &TestStore, collection: Collection, media: TestMedia, default_mime: &str) {
    let conn = store.pool.get().expect("Failed to get connection");
    let (bucket_id, bucket_name) = match media.bucket {
        Some((id, name)) => (Some(id), Some(name)),
        None => (None, None),
    };

    conn.execute(
        &format!(
            "INSERT INTO {} (_id, _display_name, datetaken, mime_type, _size, bucket_id, bucket_display_name)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            collection.table()
        ),
        rusqlite::params![
            media.id,
            media.name,
            media.date_taken,
            media.mime_type.unwrap_or_else(|| default_mime.to_string()),
            media.size,
            bucket_id,
            bucket_name,
        ],
    )
    .expect("Failed to insert test media");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::missing_columns;

    #[test]
    fn test_create_test_store() {
        let store = create_test_store();
        let conn = store.pool.get().expect("Failed to get connection");

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('images', 'videos')",
                [],
                |row| row.get(0),
            )
            .expect("Failed to count tables");
        assert_eq!(count, 2);

        assert!(missing_columns(&conn, "images").unwrap().is_empty());
        assert!(missing_columns(&conn, "videos").unwrap().is_empty());
    }

    #[test]
    fn test_insert_fixtures() {
        let store = create_test_store();
        insert_image(&store, TestMedia::new(1, "photo.jpg").bucket("b1", "Camera"));
        insert_video(&store, TestMedia::new(1, "clip.mp4"));

        let conn = store.pool.get().expect("Failed to get connection");
        let (name, bucket): (String, Option<String>) = conn
            .query_row(
                "SELECT _display_name, bucket_display_name FROM images WHERE _id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("Failed to read image");
        assert_eq!(name, "photo.jpg");
        assert_eq!(bucket.as_deref(), Some("Camera"));

        let mime: String = conn
            .query_row("SELECT mime_type FROM videos WHERE _id = 1", [], |row| row.get(0))
            .expect("Failed to read video");
        assert_eq!(mime, "video/mp4");
    }

    #[test]
    fn test_missing_columns_reports_gaps() {
        let store = create_test_store();
        let conn = store.pool.get().expect("Failed to get connection");
        conn.execute_batch("CREATE TABLE legacy (_id INTEGER, _display_name TEXT)")
            .unwrap();

        let missing = missing_columns(&conn, "legacy").unwrap();
        assert!(missing.contains(&"bucket_id"));
        assert!(!missing.contains(&"_id"));
    }
}
