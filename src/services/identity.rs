// src/services/identity.rs

//! Identity keys for candidates.
//!
//! Every function here returns a non-empty key, so two unrelated items can
//! never collide on an empty string.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the parts joined with `_`.
pub fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"_");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Feed entry key: entry id, else link, else title, else a digest of all three.
pub fn entry_key(id: &str, link: &str, title: &str) -> String {
    [id, link, title]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("entry_{}", digest(&[id, link, title])))
}

pub fn release_key(release_id: u64) -> String {
    format!("release_{release_id}")
}

pub fn post_key(post_id: &str) -> String {
    format!("tweet_{}", post_id.trim())
}

/// Key for a link-less fragment; any wording change yields a new key.
pub fn fragment_key(text: &str) -> String {
    digest(&[text])
}

/// Key for aggregator entries, which have no stable platform id.
pub fn aggregator_key(source_name: &str, title: &str, link: &str) -> String {
    digest(&[source_name, title, link])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_key_prefers_id_then_link_then_title() {
        assert_eq!(entry_key("urn:1", "https://a/1", "T"), "urn:1");
        assert_eq!(entry_key("", "https://a/1", "T"), "https://a/1");
        assert_eq!(entry_key("  ", "", "T"), "T");
    }

    #[test]
    fn entry_key_is_never_empty() {
        let key = entry_key("", " ", "");
        assert!(key.starts_with("entry_"));
        assert!(key.len() > "entry_".len());
    }

    #[test]
    fn fragment_key_is_stable_hex() {
        let a = fragment_key("Cursor 0.42 released");
        assert_eq!(a, fragment_key("Cursor 0.42 released"));
        assert_ne!(a, fragment_key("Cursor 0.43 released"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn aggregator_key_depends_on_every_part() {
        let base = aggregator_key("HN", "Title", "https://x/1");
        assert_ne!(base, aggregator_key("HN2", "Title", "https://x/1"));
        assert_ne!(base, aggregator_key("HN", "Title2", "https://x/1"));
        assert_ne!(base, aggregator_key("HN", "Title", "https://x/2"));
    }

    #[test]
    fn prefixed_keys() {
        assert_eq!(release_key(42), "release_42");
        assert_eq!(post_key("123"), "tweet_123");
    }
}
