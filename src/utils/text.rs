// src/utils/text.rs

//! Text cleanup for stored item content.

use scraper::Html;

/// Maximum stored content length, in characters.
pub const CONTENT_LIMIT: usize = 500;

const ELLIPSIS: &str = "...";

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop markup and decode entities, keeping only text nodes.
pub fn strip_markup(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(text);
    fragment.root_element().text().collect()
}

/// Cut `text` to at most `limit` characters, ending in "..." when cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Full cleanup applied to content before it is stored.
pub fn sanitize(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    truncate(&collapse_whitespace(&strip_markup(content)), CONTENT_LIMIT)
}
