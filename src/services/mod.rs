//! Source adapters.
//!
//! Every source class shares one fetch path and differs only in how it
//! builds its request and extracts candidates from the response body:
//! - Feeds (`FeedExtractor`)
//! - Repository releases (`ReleaseExtractor`)
//! - Selector-scraped news and changelog pages (`ScrapeExtractor`)
//! - Search-style aggregator feeds (`AggregatorExtractor`)
//! - Social account timelines (`TimelineExtractor`)

mod aggregator;
mod feed;
pub mod identity;
mod registry;
mod release;
mod scrape;
mod timeline;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Candidate, SourceClass, Target};

pub use aggregator::AggregatorExtractor;
pub use feed::FeedExtractor;
pub use registry::{Registry, SourceSet};
pub use release::ReleaseExtractor;
pub use scrape::{ScrapeExtractor, ScrapeStyle};
pub use timeline::TimelineExtractor;

/// A single GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Retrieves raw documents.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the body of `request`; non-success statuses are errors.
    async fn fetch(&self, request: &FetchRequest) -> Result<String>;
}

/// Per-class strategy: where to fetch and how to read the result.
pub trait Extractor: Send + Sync {
    fn class(&self) -> SourceClass;

    /// Build the request for one target.
    fn request(&self, target: &Target) -> Result<FetchRequest>;

    /// Turn a fetched body into candidates with non-empty identity keys.
    fn extract(&self, target: &Target, body: &str) -> Result<Vec<Candidate>>;
}

/// A fetcher composed with one extraction strategy.
pub struct SourceAdapter {
    fetcher: Arc<dyn Fetch>,
    extractor: Box<dyn Extractor>,
}

impl SourceAdapter {
    pub fn new(fetcher: Arc<dyn Fetch>, extractor: impl Extractor + 'static) -> Self {
        Self {
            fetcher,
            extractor: Box::new(extractor),
        }
    }

    pub fn class(&self) -> SourceClass {
        self.extractor.class()
    }

    /// Fetch one target and extract its candidates.
    pub async fn discover(&self, target: &Target) -> Result<Vec<Candidate>> {
        let request = self.extractor.request(target)?;
        log::debug!("Fetching {} for {} target {}", request.url, self.class(), target.name);
        let body = self.fetcher.fetch(&request).await?;
        let candidates = self.extractor.extract(target, &body)?;
        log::debug!(
            "{} target {} yielded {} candidates",
            self.class(),
            target.name,
            candidates.len()
        );
        Ok(candidates)
    }
}
