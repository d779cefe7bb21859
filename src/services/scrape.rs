// src/services/scrape.rs

//! Selector-driven HTML extraction.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{Extractor, FetchRequest, identity};
use crate::error::{AppError, Result};
use crate::models::{Candidate, SourceClass, Target};
use crate::utils::resolve_url;
use crate::utils::text::collapse_whitespace;

/// How matched elements become candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStyle {
    /// Each element is (or contains) a link to an article; the link is the key.
    News,
    /// Elements are link-less fragments of a page; their text is the key.
    Direct,
}

#[derive(Debug, Clone)]
pub struct ScrapeExtractor {
    style: ScrapeStyle,
    limit: usize,
}

impl ScrapeExtractor {
    pub fn news(limit: usize) -> Self {
        Self {
            style: ScrapeStyle::News,
            limit,
        }
    }

    pub fn direct(limit: usize) -> Self {
        Self {
            style: ScrapeStyle::Direct,
            limit,
        }
    }

    fn selector_for(target: &Target) -> Result<Selector> {
        let raw = target
            .selector
            .as_deref()
            .ok_or_else(|| AppError::selector("", format!("target '{}' has no selector", target.name)))?;
        Selector::parse(raw).map_err(|e| AppError::selector(raw, format!("{e:?}")))
    }

    fn news_candidate(element: ElementRef<'_>, base: &Url) -> Option<Candidate> {
        let anchor = if element.value().name() == "a" {
            element
        } else {
            let link_sel = Selector::parse("a").ok()?;
            element.select(&link_sel).next()?
        };

        let title = collapse_whitespace(&element.text().collect::<String>());
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if title.is_empty() || href.is_empty() {
            return None;
        }

        let url = resolve_url(base, href);
        Some(Candidate {
            key: url.clone(),
            title,
            url: Some(url),
            content: String::new(),
            published_at: None,
        })
    }

    fn direct_candidate(element: ElementRef<'_>, page: &str) -> Option<Candidate> {
        let title = collapse_whitespace(&element.text().collect::<String>());
        if title.is_empty() {
            return None;
        }
        Some(Candidate {
            key: identity::fragment_key(&title),
            title,
            url: Some(page.to_string()),
            content: String::new(),
            published_at: None,
        })
    }
}

impl Extractor for ScrapeExtractor {
    fn class(&self) -> SourceClass {
        match self.style {
            ScrapeStyle::News => SourceClass::ScrapedNews,
            ScrapeStyle::Direct => SourceClass::ScrapedDirect,
        }
    }

    fn request(&self, target: &Target) -> Result<FetchRequest> {
        Ok(FetchRequest::get(&target.location))
    }

    fn extract(&self, target: &Target, body: &str) -> Result<Vec<Candidate>> {
        let selector = Self::selector_for(target)?;
        let base = Url::parse(&target.location)?;
        let document = Html::parse_document(body);

        // The cap applies to matched elements, before unusable ones are dropped.
        let candidates = document
            .select(&selector)
            .take(target.limit.unwrap_or(self.limit))
            .filter_map(|element| match self.style {
                ScrapeStyle::News => Self::news_candidate(element, &base),
                ScrapeStyle::Direct => Self::direct_candidate(element, &target.location),
            })
            .collect();
        Ok(candidates)
    }
}
