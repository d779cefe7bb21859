//! Persistent item store.
//!
//! The store is the dedup memory of the monitor: one row per
//! (source class, source name, item key) triple, plus an append-only
//! notification history.
//!
//! Reads and writes never surface errors to the pipeline. Failures are
//! logged and mapped to the answer that re-surfaces items rather than
//! hiding them: an existence check that fails reports "not seen".

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

use crate::models::{ItemId, NewItem, NotificationRecord, SeenItem, SourceClass};

pub use sqlite::SqliteStore;

/// Current time at the millisecond precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Trait for seen-item storage backends.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Whether the triple is already stored. Storage errors yield `false`.
    async fn exists(&self, class: SourceClass, source_name: &str, item_key: &str) -> bool;

    /// Insert-if-absent with an explicit discovery time.
    ///
    /// Returns `None` on a duplicate triple or a storage error.
    async fn insert_at(&self, item: &NewItem, discovered_at: DateTime<Utc>) -> Option<ItemId>;

    /// Insert-if-absent, discovered now.
    async fn insert(&self, item: &NewItem) -> Option<ItemId> {
        self.insert_at(item, now()).await
    }

    /// Record one delivery attempt; a successful one marks the item notified.
    async fn mark_notified(
        &self,
        item_id: ItemId,
        channel: &str,
        success: bool,
        error: Option<&str>,
    ) -> bool;

    /// Items never successfully delivered, newest first.
    async fn list_unnotified(&self) -> Vec<SeenItem>;

    /// Items discovered within the last `max_age_days`, newest first.
    async fn list_recent(&self, max_age_days: u32) -> Vec<SeenItem>;

    /// Delete items discovered more than `max_age_days` ago; returns the count.
    async fn sweep_older_than(&self, max_age_days: u32) -> usize;

    /// Delivery attempts for one item, oldest first.
    async fn notification_history(&self, item_id: ItemId) -> Vec<NotificationRecord>;
}
