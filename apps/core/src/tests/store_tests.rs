//! Key-Value Store Tests
//!
//! File and SQLite adapters against real temporary directories.

use crate::database::SqliteStore;
use crate::store::{FileStore, KeyValueStore};
use tempfile::tempdir;

#[cfg(test)]
mod file_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path().join("never-created"));
        assert_eq!(store.get("pulse.feedback.v1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path().join("feedback"));

        store.set("pulse.feedback.v1", b"[1,2,3]".to_vec()).await.unwrap();
        store.set("pulse.feedback.v1", b"[4]".to_vec()).await.unwrap();

        assert_eq!(
            store.get("pulse.feedback.v1").await.unwrap(),
            Some(b"[4]".to_vec())
        );
        // no staging file is left behind
        let names: Vec<String> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["pulse.feedback.v1.json".to_string()]);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path());

        store.set("a", b"one".to_vec()).await.unwrap();
        store.set("b", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get("b").await.unwrap(), Some(b"two".to_vec()));
    }
}

#[cfg(test)]
mod sqlite_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_upsert() {
        let store = SqliteStore::in_memory().await.expect("Failed to open store");
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", b"first".to_vec()).await.unwrap();
        store.set("k", b"second".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"second".to_vec()));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("pulse.sqlite");

        {
            let store = SqliteStore::connect(&path).await.unwrap();
            store.set("pulse.feedback.v1", b"[]".to_vec()).await.unwrap();
            store.pool().close().await;
        }

        let reopened = SqliteStore::connect(&path).await.unwrap();
        assert_eq!(
            reopened.get("pulse.feedback.v1").await.unwrap(),
            Some(b"[]".to_vec())
        );
    }
}
