// src/services/aggregator.rs

//! Search-style aggregator feeds (news search, link aggregators).
//!
//! These feeds reorder and resurface old entries, so only the first few
//! recent entries are taken and identity is derived from their content.

use chrono::{Duration, Utc};

use super::feed::parse_entries;
use super::{Extractor, FetchRequest, identity};
use crate::error::Result;
use crate::models::{Candidate, SourceClass, Target};

#[derive(Debug, Clone)]
pub struct AggregatorExtractor {
    limit: usize,
    max_age: Duration,
}

impl AggregatorExtractor {
    pub fn new(limit: usize, max_age_days: i64) -> Self {
        Self {
            limit,
            max_age: Duration::days(max_age_days),
        }
    }
}

impl Extractor for AggregatorExtractor {
    fn class(&self) -> SourceClass {
        SourceClass::Social
    }

    fn request(&self, target: &Target) -> Result<FetchRequest> {
        Ok(FetchRequest::get(&target.location))
    }

    fn extract(&self, target: &Target, body: &str) -> Result<Vec<Candidate>> {
        let cutoff = Utc::now() - self.max_age;
        let limit = target.limit.unwrap_or(self.limit);

        let candidates = parse_entries(body)?
            .into_iter()
            .take(limit)
            // Undated entries are kept.
            .filter(|entry| entry.published_at.is_none_or(|at| at >= cutoff))
            .map(|entry| Candidate {
                key: identity::aggregator_key(&target.name, &entry.title, &entry.link),
                url: (!entry.link.is_empty()).then_some(entry.link),
                title: entry.title,
                content: entry.summary,
                published_at: entry.published_at,
            })
            .collect();
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss(items: &[(&str, &str, Option<String>)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, date)| {
                let date = date
                    .as_ref()
                    .map(|d| format!("<pubDate>{d}</pubDate>"))
                    .unwrap_or_default();
                format!("<item><title>{title}</title><link>{link}</link>{date}</item>")
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Search</title>{body}</channel></rss>"#
        )
    }

    fn days_ago(days: i64) -> Option<String> {
        Some((Utc::now() - Duration::days(days)).to_rfc2822())
    }

    #[test]
    fn takes_first_entries_then_drops_stale_ones() {
        let body = rss(&[
            ("Fresh one", "https://n.example/1", days_ago(1)),
            ("Stale", "https://n.example/2", days_ago(30)),
            ("Undated", "https://n.example/3", None),
            ("Beyond limit", "https://n.example/4", days_ago(0)),
        ]);
        let target = Target::new("AI News", "https://n.example/rss");
        let items = AggregatorExtractor::new(3, 7).extract(&target, &body).unwrap();

        let titles: Vec<_> = items.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Fresh one", "Undated"]);
    }

    #[test]
    fn per_target_limit_overrides_default() {
        let body = rss(&[
            ("A", "https://n.example/a", days_ago(0)),
            ("B", "https://n.example/b", days_ago(0)),
        ]);
        let target = Target::new("AI News", "https://n.example/rss").with_limit(1);
        let items = AggregatorExtractor::new(5, 7).extract(&target, &body).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn key_is_derived_from_source_title_and_link() {
        let body = rss(&[("Same", "https://n.example/same", None)]);
        let first = Target::new("Search A", "https://a.example/rss");
        let second = Target::new("Search B", "https://b.example/rss");
        let extractor = AggregatorExtractor::new(5, 7);

        let a = extractor.extract(&first, &body).unwrap();
        let b = extractor.extract(&second, &body).unwrap();
        assert_eq!(a[0].key, identity::aggregator_key("Search A", "Same", "https://n.example/same"));
        assert_ne!(a[0].key, b[0].key);
    }
}
