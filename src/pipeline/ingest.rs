// src/pipeline/ingest.rs

//! Discovery, filtering and dedup for one source class.

use std::sync::Arc;
use std::time::Duration;

use super::filter::KeywordFilter;
use crate::models::{Candidate, NewItem, SeenItem, SourceClass, Target};
use crate::services::{SourceAdapter, SourceSet};
use crate::storage::{ItemStore, now};
use crate::utils::text::{collapse_whitespace, sanitize};

/// Result of ingesting one class.
#[derive(Debug, Clone)]
pub struct ClassOutcome {
    pub class: SourceClass,
    /// Items inserted by this run, in discovery order
    pub batch: Vec<SeenItem>,
    pub targets_attempted: usize,
    pub errors: usize,
}

impl ClassOutcome {
    pub fn empty(class: SourceClass) -> Self {
        Self {
            class,
            batch: Vec::new(),
            targets_attempted: 0,
            errors: 0,
        }
    }

    /// Fold another outcome of the same run into this one.
    pub fn absorb(&mut self, other: ClassOutcome) {
        self.batch.extend(other.batch);
        self.targets_attempted += other.targets_attempted;
        self.errors += other.errors;
    }
}

/// Runs adapters against the item store.
pub struct IngestEngine {
    store: Arc<dyn ItemStore>,
    delay: Duration,
}

impl IngestEngine {
    pub fn new(store: Arc<dyn ItemStore>, delay: Duration) -> Self {
        Self { store, delay }
    }

    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    /// Ingest every set registered for one class.
    pub async fn ingest_sets(&self, class: SourceClass, sets: &[SourceSet]) -> ClassOutcome {
        let mut outcome = ClassOutcome::empty(class);
        for set in sets {
            outcome.absorb(self.ingest(&set.adapter, &set.targets).await);
        }
        outcome
    }

    /// Poll every enabled target of one adapter, sequentially.
    ///
    /// A failing target counts as one error and yields nothing; the
    /// remaining targets still run.
    pub async fn ingest(&self, adapter: &SourceAdapter, targets: &[Target]) -> ClassOutcome {
        let class = adapter.class();
        let mut outcome = ClassOutcome::empty(class);

        for (i, target) in targets.iter().filter(|t| t.enabled).enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            outcome.targets_attempted += 1;

            let candidates = match adapter.discover(target).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    log::error!("Error checking {class} source {}: {e}", target.name);
                    outcome.errors += 1;
                    continue;
                }
            };

            let new_items = self.admit(class, target, candidates).await;
            if !new_items.is_empty() {
                log::info!("{} new items from {class} source {}", new_items.len(), target.name);
            }
            outcome.batch.extend(new_items);
        }

        outcome
    }

    async fn admit(
        &self,
        class: SourceClass,
        target: &Target,
        candidates: Vec<Candidate>,
    ) -> Vec<SeenItem> {
        let filter = KeywordFilter::new(&target.keywords);
        let mut inserted = Vec::new();

        for candidate in candidates {
            if !filter.matches(&format!("{} {}", candidate.title, candidate.content)) {
                continue;
            }
            if self.store.exists(class, &target.name, &candidate.key).await {
                continue;
            }

            let item = NewItem {
                source_class: class,
                source_name: target.name.clone(),
                item_key: candidate.key,
                title: collapse_whitespace(&candidate.title),
                url: candidate.url,
                content: sanitize(&candidate.content),
                published_at: candidate.published_at,
            };
            let discovered_at = now();
            if let Some(id) = self.store.insert_at(&item, discovered_at).await {
                log::debug!("New {class} item from {}: {}", target.name, item.title);
                inserted.push(SeenItem::from_new(id, item, discovered_at));
            }
        }

        inserted
    }
}
