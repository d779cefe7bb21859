// src/services/release.rs

//! Repository release listings from a GitHub-compatible REST API.

use serde::Deserialize;

use super::{Extractor, FetchRequest, identity};
use crate::error::Result;
use crate::models::{Candidate, SourceClass, Target};
use crate::utils::date::parse_loose;

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    tag_name: String,
    html_url: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    draft: bool,
}

impl Release {
    fn title(&self) -> String {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.tag_name);
        format!("New release: {} ({})", name, self.tag_name)
    }
}

/// Extractor for `owner/repo` targets; most recent releases first.
#[derive(Debug, Clone)]
pub struct ReleaseExtractor {
    api_base: String,
    limit: usize,
}

impl ReleaseExtractor {
    pub fn new(api_base: impl Into<String>, limit: usize) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            limit,
        }
    }
}

impl Extractor for ReleaseExtractor {
    fn class(&self) -> SourceClass {
        SourceClass::RepoRelease
    }

    fn request(&self, target: &Target) -> Result<FetchRequest> {
        // `owner/repo`; a bare target named after its repository is accepted.
        let location = match target.location.trim() {
            "" => target.name.trim(),
            location => location,
        };
        let repo = location.trim_matches('/');
        let url = format!(
            "{}/repos/{}/releases?per_page={}",
            self.api_base,
            repo,
            target.limit.unwrap_or(self.limit)
        );
        Ok(FetchRequest::get(url).header("Accept", "application/vnd.github+json"))
    }

    fn extract(&self, target: &Target, body: &str) -> Result<Vec<Candidate>> {
        let releases: Vec<Release> = serde_json::from_str(body)?;

        let candidates = releases
            .into_iter()
            .take(target.limit.unwrap_or(self.limit))
            .filter(|r| !r.draft)
            .map(|release| Candidate {
                key: identity::release_key(release.id),
                title: release.title(),
                url: Some(release.html_url),
                content: release.body.unwrap_or_default(),
                published_at: release.published_at.as_deref().and_then(parse_loose),
            })
            .collect();
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const RELEASES: &str = r#"[
      {"id": 42, "name": "v1.2.0", "tag_name": "v1.2.0",
       "html_url": "https://github.com/openai/openai-python/releases/tag/v1.2.0",
       "body": "* Added **streaming**", "published_at": "2024-05-01T12:00:00Z", "draft": false},
      {"id": 41, "name": null, "tag_name": "v1.1.0",
       "html_url": "https://github.com/openai/openai-python/releases/tag/v1.1.0",
       "body": null, "published_at": null},
      {"id": 40, "name": "Next", "tag_name": "v2.0.0-draft",
       "html_url": "https://github.com/openai/openai-python/releases/tag/untagged",
       "draft": true}
    ]"#;

    fn target() -> Target {
        Target::new("openai/openai-python", "openai/openai-python")
    }

    #[test]
    fn builds_api_request() {
        let request = ReleaseExtractor::new("https://api.github.com/", 5)
            .request(&target())
            .unwrap();
        assert_eq!(
            request.url,
            "https://api.github.com/repos/openai/openai-python/releases?per_page=5"
        );
        assert_eq!(request.headers[0].0, "Accept");
    }

    #[test]
    fn extracts_releases_with_prefixed_keys() {
        let items = ReleaseExtractor::new("https://api.github.com", 5)
            .extract(&target(), RELEASES)
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "release_42");
        assert_eq!(items[0].title, "New release: v1.2.0 (v1.2.0)");
        assert!(items[0].published_at.is_some());
        assert_eq!(items[1].title, "New release: v1.1.0 (v1.1.0)");
        assert_eq!(items[1].content, "");
        assert_eq!(items[1].published_at, None);
    }

    #[test]
    fn limit_applies_before_draft_filtering() {
        let items = ReleaseExtractor::new("https://api.github.com", 1)
            .extract(&target(), RELEASES)
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "release_42");
    }

    #[test]
    fn non_list_payload_is_an_error() {
        let err = ReleaseExtractor::new("https://api.github.com", 5)
            .extract(&target(), r#"{"message": "Not Found"}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
    }
}
