// src/models/item.rs

//! Seen items, extraction candidates and notification records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Row identity assigned by the item store.
pub type ItemId = i64;

/// Structurally distinct polling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceClass {
    Feed,
    RepoRelease,
    ScrapedNews,
    ScrapedDirect,
    Social,
}

impl SourceClass {
    /// Every class, in sweep order.
    pub const ALL: [SourceClass; 5] = [
        SourceClass::Feed,
        SourceClass::RepoRelease,
        SourceClass::ScrapedNews,
        SourceClass::ScrapedDirect,
        SourceClass::Social,
    ];

    /// Label persisted in the item store.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceClass::Feed => "feed",
            SourceClass::RepoRelease => "repo_release",
            SourceClass::ScrapedNews => "scraped_news",
            SourceClass::ScrapedDirect => "scraped_direct",
            SourceClass::Social => "social",
        }
    }
}

impl fmt::Display for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceClass {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "feed" | "rss" => Ok(SourceClass::Feed),
            "repo_release" | "release" | "github" => Ok(SourceClass::RepoRelease),
            "scraped_news" | "news" => Ok(SourceClass::ScrapedNews),
            "scraped_direct" | "direct" => Ok(SourceClass::ScrapedDirect),
            "social" => Ok(SourceClass::Social),
            other => Err(AppError::validation(format!("Unknown source class '{other}'"))),
        }
    }
}

/// An item produced by an adapter before filtering and dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Identity key within (class, target); never empty
    pub key: String,
    pub title: String,
    pub url: Option<String>,
    /// Raw content, possibly containing markup
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A sanitized candidate ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub source_class: SourceClass,
    pub source_name: String,
    pub item_key: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A persisted item: the unit of dedup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenItem {
    pub id: ItemId,
    pub source_class: SourceClass,
    pub source_name: String,
    pub item_key: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
    pub notified: bool,
}

impl SeenItem {
    /// Build the stored form of a freshly inserted item.
    pub fn from_new(id: ItemId, item: NewItem, discovered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            source_class: item.source_class,
            source_name: item.source_name,
            item_key: item.item_key,
            title: item.title,
            url: item.url,
            content: item.content,
            published_at: item.published_at,
            discovered_at,
            notified: false,
        }
    }

    /// Human label of where the item came from.
    pub fn source_label(&self) -> &str {
        &self.source_name
    }
}

/// One delivery attempt of one item over one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub item_id: ItemId,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
}

/// Statistics handed to the summary channel after every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Job that produced the run (a class label or "full")
    pub job: String,
    pub new_items: usize,
    pub targets_attempted: usize,
    pub errors: usize,
    pub completed_at: DateTime<Utc>,
}
