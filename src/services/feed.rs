// src/services/feed.rs

//! RSS/Atom feed extraction.

use chrono::{DateTime, Utc};
use feed_rs::parser;

use super::{Extractor, FetchRequest, identity};
use crate::error::{AppError, Result};
use crate::models::{Candidate, SourceClass, Target};
use crate::utils::date::parse_loose;

const UNTITLED: &str = "No title";

/// The parts of a feed entry every feed-backed extractor needs.
#[derive(Debug, Clone)]
pub(crate) struct FeedEntry {
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Parse an RSS or Atom document into entries, in document order.
///
/// Entries without a guid/id keep an empty `id` so callers can fall back to
/// the link. Dates go through [`parse_loose`], which accepts RFC 3339 and
/// RFC 2822 before the looser formats.
pub(crate) fn parse_entries(body: &str) -> Result<Vec<FeedEntry>> {
    let feed = parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .timestamp_parser(parse_loose)
        .build()
        .parse(body.as_bytes())
        .map_err(AppError::feed)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();
            FeedEntry {
                id: entry.id,
                title: entry
                    .title
                    .map(|t| t.content)
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| UNTITLED.to_string()),
                link: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
                summary,
                published_at: entry.published.or(entry.updated),
            }
        })
        .collect();
    Ok(entries)
}

/// Extractor for plain feeds: every entry is a candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedExtractor;

impl Extractor for FeedExtractor {
    fn class(&self) -> SourceClass {
        SourceClass::Feed
    }

    fn request(&self, target: &Target) -> Result<FetchRequest> {
        Ok(FetchRequest::get(&target.location))
    }

    fn extract(&self, _target: &Target, body: &str) -> Result<Vec<Candidate>> {
        let candidates = parse_entries(body)?
            .into_iter()
            .map(|entry| Candidate {
                key: identity::entry_key(&entry.id, &entry.link, &entry.title),
                url: (!entry.link.is_empty()).then_some(entry.link),
                title: entry.title,
                content: entry.summary,
                published_at: entry.published_at,
            })
            .collect();
        Ok(candidates)
    }
}
