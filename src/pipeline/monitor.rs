// src/pipeline/monitor.rs

//! Run orchestration: ingest, notify, record, sweep.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use super::ingest::{ClassOutcome, IngestEngine};
use crate::error::Result;
use crate::models::{Config, RunSummary, SeenItem, SourceClass};
use crate::notify::Notifier;
use crate::services::Registry;
use crate::storage::{ItemStore, SqliteStore, now};
use crate::utils::http::HttpFetcher;

/// Job label of the full reconciliation sweep.
pub const FULL_SWEEP: &str = "full";

/// Owns every component of a monitoring run.
///
/// Each source class has its own lock, held from discovery until the
/// class's batch is recorded, so a class never ingests twice at once and
/// the full sweep never reconciles a batch that is still being delivered.
pub struct Monitor {
    engine: IngestEngine,
    registry: Registry,
    notifier: Notifier,
    retention_days: u32,
    locks: BTreeMap<SourceClass, Mutex<()>>,
}

impl Monitor {
    pub fn new(
        store: Arc<dyn ItemStore>,
        registry: Registry,
        notifier: Notifier,
        request_delay: Duration,
        retention_days: u32,
    ) -> Self {
        Self {
            engine: IngestEngine::new(store, request_delay),
            registry,
            notifier,
            retention_days,
            locks: SourceClass::ALL.into_iter().map(|c| (c, Mutex::new(()))).collect(),
        }
    }

    /// Open the store under `storage_dir` and wire every configured source.
    pub async fn from_config(config: &Config, storage_dir: &Path) -> Result<Self> {
        let store = SqliteStore::open(storage_dir.join(&config.storage.database)).await?;
        let fetcher = HttpFetcher::from_config(&config.http)?;
        let registry = Registry::from_config(config, Arc::new(fetcher));
        let notifier = Notifier::from_config(&config.notify)?;

        Ok(Self::new(
            Arc::new(store),
            registry,
            notifier,
            Duration::from_millis(config.http.request_delay_ms),
            config.storage.retention_days,
        ))
    }

    pub fn store(&self) -> &Arc<dyn ItemStore> {
        self.engine.store()
    }

    async fn lock(&self, class: SourceClass) -> Option<MutexGuard<'_, ()>> {
        match self.locks.get(&class) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    async fn ingest_class(&self, class: SourceClass) -> ClassOutcome {
        log::info!(
            "Checking {} {class} sources",
            self.registry.target_count(class)
        );
        self.engine.ingest_sets(class, self.registry.sets(class)).await
    }

    /// One scheduled run of a single class.
    pub async fn run_class(&self, class: SourceClass) -> RunSummary {
        let _guard = self.lock(class).await;
        let outcome = self.ingest_class(class).await;
        self.complete(
            class.as_str(),
            outcome.batch,
            outcome.targets_attempted,
            outcome.errors,
        )
        .await
    }

    /// Every class in turn, plus redelivery of items left unnotified by
    /// interrupted runs or failed deliveries.
    pub async fn run_full(&self) -> RunSummary {
        let pending = {
            let mut guards = Vec::with_capacity(self.locks.len());
            for lock in self.locks.values() {
                guards.push(lock.lock().await);
            }
            self.store().list_unnotified().await
        };
        if !pending.is_empty() {
            log::info!("Reconciling {} previously unnotified items", pending.len());
        }

        let mut seen_ids: HashSet<_> = pending.iter().map(|item| item.id).collect();
        let mut batch = pending;
        let (mut targets_attempted, mut errors) = (0, 0);
        for class in SourceClass::ALL {
            let _guard = self.lock(class).await;
            let outcome = self.ingest_class(class).await;
            targets_attempted += outcome.targets_attempted;
            errors += outcome.errors;
            batch.extend(outcome.batch.into_iter().filter(|item| seen_ids.insert(item.id)));
        }

        self.complete(FULL_SWEEP, batch, targets_attempted, errors)
            .await
    }

    /// Notify, record each channel's outcome, summarize, then sweep.
    async fn complete(
        &self,
        job: &str,
        batch: Vec<SeenItem>,
        targets_attempted: usize,
        errors: usize,
    ) -> RunSummary {
        if batch.is_empty() {
            log::info!("No new items from {job} run");
        } else {
            let reports = self.notifier.dispatch(&batch).await;
            for item in &batch {
                for report in &reports {
                    self.store()
                        .mark_notified(item.id, &report.channel, report.success, report.error.as_deref())
                        .await;
                }
            }
            if !Notifier::delivered(&reports) {
                log::warn!(
                    "{} items from {job} run were not delivered; they will be retried by the next full sweep",
                    batch.len()
                );
            }
        }

        let summary = RunSummary {
            job: job.to_string(),
            new_items: batch.len(),
            targets_attempted,
            errors,
            completed_at: now(),
        };
        self.notifier.summarize(&summary).await;
        self.store().sweep_older_than(self.retention_days).await;
        summary
    }

    /// Items discovered in the last `days`, newest first.
    pub async fn recent(&self, days: u32) -> Vec<SeenItem> {
        self.store().list_recent(days).await
    }

    /// Push a synthetic item through every channel without storing it.
    pub async fn send_test_notification(&self) -> bool {
        let item = SeenItem {
            id: 0,
            source_class: SourceClass::Feed,
            source_name: "feedwatch self-test".to_string(),
            item_key: "test".to_string(),
            title: "Test notification: monitoring is live".to_string(),
            url: Some("https://example.com".to_string()),
            content: "If you can read this, notification delivery is configured correctly."
                .to_string(),
            published_at: Some(now()),
            discovered_at: now(),
            notified: false,
        };
        log::info!("Sending test notification");
        Notifier::delivered(&self.notifier.dispatch(&[item]).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Target;
    use crate::notify::tests::RecordingChannel;
    use crate::pipeline::test_support::{StubFetch, rss};
    use crate::services::{FeedExtractor, ReleaseExtractor, SourceAdapter, SourceSet};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Arc<SqliteStore>,
        fetch: StubFetch,
        channel: RecordingChannel,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("items.db")).await.unwrap());
        Fixture {
            _dir: dir,
            store,
            fetch: StubFetch::default(),
            channel: RecordingChannel::new("console"),
        }
    }

    fn monitor(fx: &Fixture, channel: RecordingChannel) -> Monitor {
        let registry = Registry::new().with(SourceSet::new(
            SourceAdapter::new(Arc::new(fx.fetch.clone()), FeedExtractor),
            vec![Target::new("Blog", "https://blog.example/rss").with_keywords(&["gpt"])],
        ));
        Monitor::new(
            fx.store.clone(),
            registry,
            Notifier::new().with_channel(channel),
            Duration::ZERO,
            30,
        )
    }

    #[tokio::test]
    async fn class_run_notifies_and_marks_items() {
        let fx = fixture().await;
        fx.fetch.serve(
            "https://blog.example/rss",
            rss(&[("a", "GPT-5 launch"), ("b", "Office party")]),
        );
        let monitor = monitor(&fx, fx.channel.clone());

        let summary = monitor.run_class(SourceClass::Feed).await;
        assert_eq!(summary.job, "feed");
        assert_eq!(summary.new_items, 1);
        assert_eq!(summary.targets_attempted, 1);
        assert_eq!(fx.channel.batches(), vec![vec!["a".to_string()]]);
        assert_eq!(fx.channel.summaries().len(), 1);
        assert!(fx.store.list_unnotified().await.is_empty());

        let again = monitor.run_class(SourceClass::Feed).await;
        assert_eq!(again.new_items, 0);
        assert_eq!(fx.channel.batches().len(), 1);
        assert_eq!(fx.channel.summaries().len(), 2);
    }

    #[tokio::test]
    async fn failed_delivery_is_reconciled_by_full_sweep() {
        let fx = fixture().await;
        fx.fetch.serve("https://blog.example/rss", rss(&[("a", "GPT-5 launch")]));

        let broken = monitor(&fx, RecordingChannel::failing("email"));
        broken.run_class(SourceClass::Feed).await;
        let pending = fx.store.list_unnotified().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(fx.store.notification_history(pending[0].id).await.len(), 1);

        let healthy = monitor(&fx, fx.channel.clone());
        let summary = healthy.run_full().await;
        assert_eq!(summary.job, FULL_SWEEP);
        assert_eq!(summary.new_items, 1);
        assert_eq!(fx.channel.batches(), vec![vec!["a".to_string()]]);
        assert!(fx.store.list_unnotified().await.is_empty());
    }

    #[tokio::test]
    async fn failing_targets_still_summarize() {
        let fx = fixture().await;
        let monitor = monitor(&fx, fx.channel.clone());

        let summary = monitor.run_full().await;
        assert_eq!(summary.new_items, 0);
        assert_eq!(summary.errors, 1);
        assert!(fx.channel.batches().is_empty());
        assert_eq!(fx.channel.summaries(), vec![summary]);
    }

    #[tokio::test]
    async fn full_sweep_totals_every_class() {
        let fx = fixture().await;
        fx.fetch.serve("https://blog.example/rss", rss(&[("a", "GPT-5 launch")]));
        fx.fetch.serve(
            "https://api.example/repos/openai/foo/releases?per_page=5",
            r#"[{"id": 42, "tag_name": "v1.0.0", "html_url": "https://github.com/openai/foo/v1"}]"#,
        );
        let registry = Registry::new()
            .with(SourceSet::new(
                SourceAdapter::new(Arc::new(fx.fetch.clone()), FeedExtractor),
                vec![Target::new("Blog", "https://blog.example/rss").with_keywords(&["gpt"])],
            ))
            .with(SourceSet::new(
                SourceAdapter::new(
                    Arc::new(fx.fetch.clone()),
                    ReleaseExtractor::new("https://api.example", 5),
                ),
                vec![
                    Target::new("openai/foo", "openai/foo"),
                    Target::new("openai/gone", "openai/gone"),
                ],
            ));
        let monitor = Monitor::new(
            fx.store.clone(),
            registry,
            Notifier::new().with_channel(fx.channel.clone()),
            Duration::ZERO,
            30,
        );

        let summary = monitor.run_full().await;
        assert_eq!(summary.new_items, 2);
        assert_eq!(summary.targets_attempted, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(fx.channel.batches().len(), 1);
        assert_eq!(fx.channel.batches()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_notification_is_not_stored() {
        let fx = fixture().await;
        let monitor = monitor(&fx, fx.channel.clone());

        assert!(monitor.send_test_notification().await);
        assert_eq!(fx.channel.batches(), vec![vec!["test".to_string()]]);
        assert!(monitor.recent(1).await.is_empty());
    }
}
