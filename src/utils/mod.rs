//! Utility functions and helpers.

pub mod date;
pub mod http;
pub mod text;

use url::Url;

/// Resolve a possibly relative link against the page it was found on.
///
/// Links that cannot be joined are returned unchanged.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_article_links_against_listing_page() {
        let base = Url::parse("https://www.verge.example/ai-artificial-intelligence").unwrap();
        assert_eq!(
            resolve_url(&base, "/2024/5/1/gpt-5"),
            "https://www.verge.example/2024/5/1/gpt-5"
        );
        assert_eq!(
            resolve_url(&base, "claude-4"),
            "https://www.verge.example/claude-4"
        );
        assert_eq!(
            resolve_url(&base, " https://other.example/x "),
            "https://other.example/x"
        );
    }
}
