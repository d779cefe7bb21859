// src/storage/sqlite.rs

//! SQLite item store on a small `sqlx` pool.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::{ItemStore, now};
use crate::error::{AppError, Result};
use crate::models::{ItemId, NewItem, NotificationRecord, SeenItem, SourceClass};

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

const ITEM_COLUMNS: &str = "id, source_class, source_name, item_key, title, url, content, \
                            published_at, discovered_at, notified";

/// Item store backed by a SQLite database file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.setup_schema().await?;
        log::info!("Opened item store at {}", path.display());
        Ok(store)
    }

    async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_class TEXT NOT NULL,
                source_name TEXT NOT NULL,
                item_key TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT,
                content TEXT NOT NULL DEFAULT '',
                published_at INTEGER,
                discovered_at INTEGER NOT NULL,
                notified INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS seen_items_identity \
             ON seen_items (source_class, source_name, item_key)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS seen_items_discovered ON seen_items (discovered_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notification_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL,
                channel TEXT NOT NULL,
                sent_at INTEGER NOT NULL,
                success INTEGER NOT NULL,
                error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Close the pool; later operations fail and take their fallback paths.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn try_exists(&self, class: SourceClass, source_name: &str, item_key: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM seen_items WHERE source_class = ? AND source_name = ? AND item_key = ?",
        )
        .bind(class.as_str())
        .bind(source_name)
        .bind(item_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn try_insert(&self, item: &NewItem, discovered_at: DateTime<Utc>) -> Result<Option<ItemId>> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO seen_items
                (source_class, source_name, item_key, title, url, content,
                 published_at, discovered_at, notified)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(item.source_class.as_str())
        .bind(&item.source_name)
        .bind(&item.item_key)
        .bind(&item.title)
        .bind(item.url.as_deref())
        .bind(&item.content)
        .bind(item.published_at.map(|at| at.timestamp_millis()))
        .bind(discovered_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(result.last_insert_rowid()))
    }

    async fn try_mark_notified(
        &self,
        item_id: ItemId,
        channel: &str,
        success: bool,
        error: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO notification_history (item_id, channel, sent_at, success, error) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item_id)
        .bind(channel)
        .bind(now().timestamp_millis())
        .bind(success)
        .bind(error)
        .execute(&mut *tx)
        .await?;

        if success {
            sqlx::query("UPDATE seen_items SET notified = 1 WHERE id = ?")
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn try_list(&self, clause: &str, bind: Option<i64>) -> Result<Vec<SeenItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM seen_items WHERE {clause} \
             ORDER BY discovered_at DESC, published_at DESC, id DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn try_sweep(&self, max_age_days: u32) -> Result<usize> {
        let result = sqlx::query("DELETE FROM seen_items WHERE discovered_at < ?")
            .bind(cutoff_millis(max_age_days))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn try_history(&self, item_id: ItemId) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT item_id, channel, sent_at, success, error FROM notification_history \
             WHERE item_id = ? ORDER BY sent_at ASC, id ASC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(NotificationRecord {
                    item_id: row.try_get("item_id")?,
                    channel: row.try_get("channel")?,
                    sent_at: from_millis(row.try_get("sent_at")?)?,
                    success: row.try_get("success")?,
                    error: row.try_get("error")?,
                })
            })
            .collect()
    }
}

fn cutoff_millis(max_age_days: u32) -> i64 {
    now().timestamp_millis() - i64::from(max_age_days) * DAY_MILLIS
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::validation(format!("Timestamp out of range: {millis}")))
}

fn item_from_row(row: &SqliteRow) -> Result<SeenItem> {
    let class: String = row.try_get("source_class")?;
    let published: Option<i64> = row.try_get("published_at")?;
    Ok(SeenItem {
        id: row.try_get("id")?,
        source_class: class.parse()?,
        source_name: row.try_get("source_name")?,
        item_key: row.try_get("item_key")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        content: row.try_get("content")?,
        published_at: published.map(from_millis).transpose()?,
        discovered_at: from_millis(row.try_get("discovered_at")?)?,
        notified: row.try_get("notified")?,
    })
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn exists(&self, class: SourceClass, source_name: &str, item_key: &str) -> bool {
        self.try_exists(class, source_name, item_key)
            .await
            .unwrap_or_else(|e| {
                log::error!("Existence check failed for {class}/{source_name}/{item_key}: {e}");
                false
            })
    }

    async fn insert_at(&self, item: &NewItem, discovered_at: DateTime<Utc>) -> Option<ItemId> {
        match self.try_insert(item, discovered_at).await {
            Ok(id) => id,
            Err(e) => {
                log::error!(
                    "Insert failed for {}/{}/{}: {e}",
                    item.source_class,
                    item.source_name,
                    item.item_key
                );
                None
            }
        }
    }

    async fn mark_notified(
        &self,
        item_id: ItemId,
        channel: &str,
        success: bool,
        error: Option<&str>,
    ) -> bool {
        match self.try_mark_notified(item_id, channel, success, error).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to record delivery of item {item_id} on {channel}: {e}");
                false
            }
        }
    }

    async fn list_unnotified(&self) -> Vec<SeenItem> {
        self.try_list("notified = 0", None).await.unwrap_or_else(|e| {
            log::error!("Failed to list unnotified items: {e}");
            Vec::new()
        })
    }

    async fn list_recent(&self, max_age_days: u32) -> Vec<SeenItem> {
        self.try_list("discovered_at >= ?", Some(cutoff_millis(max_age_days)))
            .await
            .unwrap_or_else(|e| {
                log::error!("Failed to list recent items: {e}");
                Vec::new()
            })
    }

    async fn sweep_older_than(&self, max_age_days: u32) -> usize {
        match self.try_sweep(max_age_days).await {
            Ok(removed) => {
                if removed > 0 {
                    log::info!("Retention sweep removed {removed} items older than {max_age_days} days");
                }
                removed
            }
            Err(e) => {
                log::error!("Retention sweep failed: {e}");
                0
            }
        }
    }

    async fn notification_history(&self, item_id: ItemId) -> Vec<NotificationRecord> {
        self.try_history(item_id).await.unwrap_or_else(|e| {
            log::error!("Failed to load notification history for item {item_id}: {e}");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("items.db")).await.unwrap();
        (dir, store)
    }

    fn item(key: &str, content: &str) -> NewItem {
        NewItem {
            source_class: SourceClass::RepoRelease,
            source_name: "openai/foo".to_string(),
            item_key: key.to_string(),
            title: format!("New release: {key}"),
            url: Some(format!("https://github.com/openai/foo/{key}")),
            content: content.to_string(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn second_insert_of_a_triple_is_a_no_op() {
        let (_dir, store) = open_store().await;

        let t0 = now() - ChronoDuration::hours(2);
        let first = store.insert_at(&item("release_42", "first body"), t0).await;
        assert!(first.is_some());
        assert!(store.exists(SourceClass::RepoRelease, "openai/foo", "release_42").await);

        let again = store.insert(&item("release_42", "second body")).await;
        assert_eq!(again, None);

        let items = store.list_recent(1).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "first body");
        assert_eq!(Some(items[0].id), first);
        assert_eq!(items[0].discovered_at, t0);
    }

    #[tokio::test]
    async fn same_key_under_another_source_is_distinct() {
        let (_dir, store) = open_store().await;
        let mut other = item("release_42", "");
        other.source_name = "openai/bar".to_string();

        assert!(store.insert(&item("release_42", "")).await.is_some());
        assert!(store.insert(&other).await.is_some());
        assert!(!store.exists(SourceClass::Feed, "openai/foo", "release_42").await);
    }

    #[tokio::test]
    async fn round_trips_optional_fields() {
        let (_dir, store) = open_store().await;
        let published = now() - ChronoDuration::hours(3);
        let mut new = item("release_7", "body");
        new.published_at = Some(published);
        new.url = None;

        store.insert(&new).await.unwrap();
        let stored = &store.list_unnotified().await[0];
        assert_eq!(stored.published_at, Some(published));
        assert_eq!(stored.url, None);
        assert_eq!(stored.source_class, SourceClass::RepoRelease);
        assert!(!stored.notified);
    }

    #[tokio::test]
    async fn only_successful_delivery_marks_notified() {
        let (_dir, store) = open_store().await;
        let id = store.insert(&item("release_1", "")).await.unwrap();

        assert!(store.mark_notified(id, "email", false, Some("smtp down")).await);
        assert_eq!(store.list_unnotified().await.len(), 1);

        assert!(store.mark_notified(id, "console", true, None).await);
        assert!(store.list_unnotified().await.is_empty());

        // Re-marking is harmless.
        assert!(store.mark_notified(id, "console", true, None).await);
        let history = store.notification_history(id).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].channel, "email");
        assert_eq!(history[0].error.as_deref(), Some("smtp down"));
        assert!(!history[0].success);
        assert!(history[1].success);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let (_dir, store) = open_store().await;
        let base = now();
        store.insert_at(&item("a", ""), base - ChronoDuration::hours(2)).await;
        store.insert_at(&item("b", ""), base).await;
        store.insert_at(&item("c", ""), base - ChronoDuration::hours(1)).await;

        let keys: Vec<_> = store
            .list_unnotified()
            .await
            .into_iter()
            .map(|i| i.item_key)
            .collect();
        assert_eq!(keys, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn sweep_removes_exactly_the_old_items() {
        let (_dir, store) = open_store().await;
        let base = now();
        let old = store
            .insert_at(&item("old", ""), base - ChronoDuration::days(31))
            .await
            .unwrap();
        store.insert_at(&item("recent", ""), base - ChronoDuration::days(29)).await;
        store.insert(&item("fresh", "")).await;
        store.mark_notified(old, "console", true, None).await;

        assert_eq!(store.sweep_older_than(30).await, 1);
        assert!(!store.exists(SourceClass::RepoRelease, "openai/foo", "old").await);
        assert!(store.exists(SourceClass::RepoRelease, "openai/foo", "recent").await);
        assert_eq!(store.list_recent(30).await.len(), 2);
        assert_eq!(store.list_recent(1).await.len(), 1);
        // History of swept items is left in place.
        assert_eq!(store.notification_history(old).await.len(), 1);
    }

    #[tokio::test]
    async fn storage_failures_fall_back_to_resurfacing() {
        let (_dir, store) = open_store().await;
        store.insert(&item("release_9", "")).await.unwrap();
        store.close().await;

        assert!(!store.exists(SourceClass::RepoRelease, "openai/foo", "release_9").await);
        assert_eq!(store.insert(&item("release_10", "")).await, None);
        assert!(!store.mark_notified(1, "console", true, None).await);
        assert!(store.list_unnotified().await.is_empty());
        assert_eq!(store.sweep_older_than(30).await, 0);
    }

    #[tokio::test]
    async fn reopening_keeps_items() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("items.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.insert(&item("release_5", "")).await.unwrap();
            store.close().await;
        }
        let store = SqliteStore::open(&path).await.unwrap();
        assert!(store.exists(SourceClass::RepoRelease, "openai/foo", "release_5").await);
    }
}
