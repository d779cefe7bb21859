// src/services/timeline.rs

//! Social account timelines over the X API v2.
//!
//! Targets carry the numeric account id as their location and the
//! account handle for building titles and post links.

use chrono::{Duration, Utc};
use serde::Deserialize;

use super::{Extractor, FetchRequest, identity};
use crate::error::{AppError, Result};
use crate::models::{Candidate, SourceClass, Target, is_account_id};
use crate::utils::date::parse_loose;

const TITLE_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct TimelinePage {
    #[serde(default)]
    data: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TimelineExtractor {
    api_base: String,
    bearer_token: String,
    limit: usize,
    max_age: Duration,
}

impl TimelineExtractor {
    pub fn new(
        api_base: impl Into<String>,
        bearer_token: impl Into<String>,
        limit: usize,
        max_age_hours: i64,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            limit,
            max_age: Duration::hours(max_age_hours),
        }
    }

    fn handle<'a>(target: &'a Target) -> &'a str {
        target
            .handle
            .as_deref()
            .unwrap_or(&target.name)
            .trim_start_matches('@')
    }
}

impl Extractor for TimelineExtractor {
    fn class(&self) -> SourceClass {
        SourceClass::Social
    }

    fn request(&self, target: &Target) -> Result<FetchRequest> {
        // The API accepts 5..=100 results per page.
        let max_results = target.limit.unwrap_or(self.limit).clamp(5, 100);
        if !is_account_id(&target.location) {
            return Err(AppError::fetch(
                format!("social/{}", target.name),
                format!("'{}' is not a numeric account id", target.location),
            ));
        }
        let url = format!(
            "{}/users/{}/tweets?max_results={}&tweet.fields=created_at,text&exclude=retweets,replies",
            self.api_base,
            target.location.trim(),
            max_results
        );
        Ok(FetchRequest::get(url).header("Authorization", format!("Bearer {}", self.bearer_token)))
    }

    fn extract(&self, target: &Target, body: &str) -> Result<Vec<Candidate>> {
        let page: TimelinePage = serde_json::from_str(body)?;
        let cutoff = Utc::now() - self.max_age;
        let handle = Self::handle(target);

        let candidates = page
            .data
            .into_iter()
            .take(target.limit.unwrap_or(self.limit))
            .filter(|post| !post.id.trim().is_empty())
            .filter_map(|post| {
                let published_at = post.created_at.as_deref().and_then(parse_loose);
                if published_at.is_some_and(|at| at < cutoff) {
                    return None;
                }
                let head: String = post.text.chars().take(TITLE_CHARS).collect();
                Some(Candidate {
                    key: identity::post_key(&post.id),
                    title: format!("@{handle}: {head}..."),
                    url: Some(format!("https://twitter.com/{handle}/status/{}", post.id.trim())),
                    content: post.text,
                    published_at,
                })
            })
            .collect();
        Ok(candidates)
    }
}
