// src/services/registry.rs

//! Wiring of configured targets to their adapters.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    AggregatorExtractor, Fetch, FeedExtractor, ReleaseExtractor, ScrapeExtractor, SourceAdapter,
    TimelineExtractor,
};
use crate::models::{Config, SourceClass, Target};

/// One adapter and the targets it polls.
pub struct SourceSet {
    pub adapter: SourceAdapter,
    pub targets: Vec<Target>,
}

impl SourceSet {
    pub fn new(adapter: SourceAdapter, targets: Vec<Target>) -> Self {
        Self { adapter, targets }
    }
}

/// Source sets grouped by class. A class may hold several sets
/// (the social class polls aggregators and timelines).
#[derive(Default)]
pub struct Registry {
    sets: BTreeMap<SourceClass, Vec<SourceSet>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set under its adapter's class.
    pub fn add(&mut self, set: SourceSet) {
        self.sets.entry(set.adapter.class()).or_default().push(set);
    }

    pub fn with(mut self, set: SourceSet) -> Self {
        self.add(set);
        self
    }

    pub fn sets(&self, class: SourceClass) -> &[SourceSet] {
        self.sets.get(&class).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of enabled targets in `class`.
    pub fn target_count(&self, class: SourceClass) -> usize {
        self.sets(class)
            .iter()
            .flat_map(|set| set.targets.iter())
            .filter(|t| t.enabled)
            .count()
    }

    /// Build every adapter the configuration asks for, sharing one fetcher.
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetch>) -> Self {
        let sources = &config.sources;
        let limits = &config.limits;

        let mut registry = Self::new()
            .with(SourceSet::new(
                SourceAdapter::new(fetcher.clone(), FeedExtractor),
                sources.feeds.clone(),
            ))
            .with(SourceSet::new(
                SourceAdapter::new(
                    fetcher.clone(),
                    ReleaseExtractor::new(&sources.release_api_base, limits.releases),
                ),
                sources.releases.clone(),
            ))
            .with(SourceSet::new(
                SourceAdapter::new(fetcher.clone(), ScrapeExtractor::news(limits.news)),
                sources.news.clone(),
            ))
            .with(SourceSet::new(
                SourceAdapter::new(fetcher.clone(), ScrapeExtractor::direct(limits.direct)),
                sources.direct.clone(),
            ))
            .with(SourceSet::new(
                SourceAdapter::new(
                    fetcher.clone(),
                    AggregatorExtractor::new(limits.aggregators, limits.aggregator_max_age_days),
                ),
                sources.aggregators.clone(),
            ));

        match sources.bearer_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => registry.add(SourceSet::new(
                SourceAdapter::new(
                    fetcher,
                    TimelineExtractor::new(
                        &sources.timeline_api_base,
                        token,
                        limits.timelines,
                        limits.timeline_max_age_hours,
                    ),
                ),
                sources.timelines.clone(),
            )),
            _ => log::info!("No timeline bearer token configured; account timelines are skipped"),
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::services::FetchRequest;
    use async_trait::async_trait;

    struct NoFetch;

    #[async_trait]
    impl Fetch for NoFetch {
        async fn fetch(&self, request: &FetchRequest) -> Result<String> {
            Err(crate::error::AppError::fetch(&request.url, "offline"))
        }
    }

    #[test]
    fn default_config_registers_every_class_but_timelines() {
        let registry = Registry::from_config(&Config::default(), Arc::new(NoFetch));
        let config = Config::default();

        assert_eq!(registry.target_count(SourceClass::Feed), config.sources.feeds.len());
        assert_eq!(registry.target_count(SourceClass::RepoRelease), config.sources.releases.len());
        assert_eq!(registry.target_count(SourceClass::ScrapedNews), config.sources.news.len());
        assert_eq!(registry.target_count(SourceClass::ScrapedDirect), config.sources.direct.len());
        assert_eq!(registry.sets(SourceClass::Social).len(), 1);
    }

    #[test]
    fn bearer_token_enables_timelines() {
        let mut config = Config::default();
        config.sources.bearer_token = Some("token".to_string());
        let registry = Registry::from_config(&config, Arc::new(NoFetch));

        assert_eq!(registry.sets(SourceClass::Social).len(), 2);
        assert_eq!(
            registry.target_count(SourceClass::Social),
            config.sources.aggregators.len() + config.sources.timelines.len()
        );
    }

    #[test]
    fn disabled_targets_are_not_counted() {
        let mut config = Config::default();
        config.sources.feeds[0].enabled = false;
        let registry = Registry::from_config(&config, Arc::new(NoFetch));
        assert_eq!(registry.target_count(SourceClass::Feed), config.sources.feeds.len() - 1);
    }
}
