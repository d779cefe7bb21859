//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SourceClass;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Polling cadences
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Item store location and retention
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification channels
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Targets grouped by source class
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Per-class extraction caps and recency windows
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Fill secrets from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(user) = non_empty("FEEDWATCH_SMTP_USERNAME") {
            self.notify.email.username = user;
        }
        if let Some(pass) = non_empty("FEEDWATCH_SMTP_PASSWORD") {
            self.notify.email.password = pass;
        }
        if let Some(token) = non_empty("X_BEARER_TOKEN") {
            self.sources.bearer_token = Some(token);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.schedule.tick_secs == 0 {
            return Err(AppError::validation("schedule.tick_secs must be > 0"));
        }
        if self.schedule.full_sweep_minutes == 0 {
            return Err(AppError::validation(
                "schedule.full_sweep_minutes must be > 0",
            ));
        }
        if self.storage.retention_days == 0 {
            return Err(AppError::validation("storage.retention_days must be > 0"));
        }
        if self.storage.database.trim().is_empty() {
            return Err(AppError::validation("storage.database is empty"));
        }

        let groups: [(&str, &[Target], bool, bool); 6] = [
            ("feeds", self.sources.feeds.as_slice(), true, false),
            ("releases", self.sources.releases.as_slice(), false, false),
            ("news", self.sources.news.as_slice(), true, true),
            ("direct", self.sources.direct.as_slice(), true, true),
            ("aggregators", self.sources.aggregators.as_slice(), true, false),
            ("timelines", self.sources.timelines.as_slice(), false, false),
        ];
        for (group, targets, needs_url, needs_selector) in groups {
            validate_targets(group, targets, needs_url, needs_selector)?;
        }
        for target in &self.sources.timelines {
            if !is_account_id(&target.location) {
                return Err(AppError::validation(format!(
                    "sources.timelines.{}: location must be a numeric account id, got '{}'",
                    target.name, target.location
                )));
            }
        }

        if self.notify.email.enabled {
            let email = &self.notify.email;
            if email.smtp_server.trim().is_empty() {
                return Err(AppError::validation("notify.email.smtp_server is empty"));
            }
            if email.username.trim().is_empty() || email.password.is_empty() {
                return Err(AppError::validation(
                    "notify.email requires username and password",
                ));
            }
            if email.to.is_empty() {
                return Err(AppError::validation("notify.email.to has no recipients"));
            }
        }
        Ok(())
    }
}

/// Timeline locations are numeric account ids, never handles.
pub fn is_account_id(location: &str) -> bool {
    let id = location.trim();
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

fn validate_targets(
    group: &str,
    targets: &[Target],
    needs_url: bool,
    needs_selector: bool,
) -> Result<()> {
    let mut names = HashSet::new();
    for target in targets {
        if target.name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "sources.{group}: target name is empty"
            )));
        }
        if !names.insert(target.name.as_str()) {
            return Err(AppError::validation(format!(
                "sources.{group}: duplicate target '{}'",
                target.name
            )));
        }
        if needs_url {
            url::Url::parse(&target.location).map_err(|e| {
                AppError::validation(format!(
                    "sources.{group}.{}: invalid location '{}': {e}",
                    target.name, target.location
                ))
            })?;
        }
        if needs_selector {
            let selector = target.selector.as_deref().unwrap_or("");
            if selector.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "sources.{group}.{}: selector is required",
                    target.name
                )));
            }
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
    }
    Ok(())
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between consecutive targets in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Polling cadences in minutes. Zero disables a class's own job; the
/// class is then only visited by the full sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Scheduler wake-up period in seconds
    #[serde(default = "defaults::tick")]
    pub tick_secs: u64,

    #[serde(default = "defaults::feed_minutes")]
    pub feed_minutes: u64,

    #[serde(default = "defaults::release_minutes")]
    pub release_minutes: u64,

    #[serde(default = "defaults::news_minutes")]
    pub news_minutes: u64,

    #[serde(default)]
    pub direct_minutes: u64,

    #[serde(default)]
    pub social_minutes: u64,

    #[serde(default = "defaults::full_sweep_minutes")]
    pub full_sweep_minutes: u64,
}

impl ScheduleConfig {
    /// Polling period of a class's own job, if it has one.
    pub fn interval(&self, class: SourceClass) -> Option<Duration> {
        let minutes = match class {
            SourceClass::Feed => self.feed_minutes,
            SourceClass::RepoRelease => self.release_minutes,
            SourceClass::ScrapedNews => self.news_minutes,
            SourceClass::ScrapedDirect => self.direct_minutes,
            SourceClass::Social => self.social_minutes,
        };
        (minutes > 0).then(|| Duration::from_secs(minutes * 60))
    }

    pub fn full_sweep(&self) -> Duration {
        Duration::from_secs(self.full_sweep_minutes * 60)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_secs: defaults::tick(),
            feed_minutes: defaults::feed_minutes(),
            release_minutes: defaults::release_minutes(),
            news_minutes: defaults::news_minutes(),
            direct_minutes: 0,
            social_minutes: 0,
            full_sweep_minutes: defaults::full_sweep_minutes(),
        }
    }
}

/// Item store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file, relative to the storage directory
    #[serde(default = "defaults::database")]
    pub database: String,

    /// Items discovered longer ago than this are swept
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: defaults::database(),
            retention_days: defaults::retention_days(),
        }
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Log new items to the console
    #[serde(default = "defaults::enabled")]
    pub console: bool,

    #[serde(default)]
    pub email: EmailConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            console: true,
            email: EmailConfig::default(),
        }
    }
}

/// SMTP delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::smtp_server")]
    pub smtp_server: String,

    /// 465 uses implicit TLS, anything else STARTTLS
    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    /// Sender address; defaults to the username
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub to: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: defaults::smtp_server(),
            smtp_port: defaults::smtp_port(),
            username: String::new(),
            password: String::new(),
            from: None,
            to: Vec::new(),
        }
    }
}

/// One configured polling target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Human label; part of every item's identity triple
    pub name: String,

    /// Class specific fetch location: a URL for feeds and pages,
    /// `owner/repo` for releases, an account id for timelines
    #[serde(default, alias = "url")]
    pub location: String,

    /// CSS selector for scraped classes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Case-insensitive substrings; empty means everything matches
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Account handle for timeline targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    /// Overrides the class's candidate cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Target {
    /// Minimal target with a name and location.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            selector: None,
            keywords: Vec::new(),
            enabled: true,
            handle: None,
            limit: None,
        }
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Targets grouped by source class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "defaults::feeds")]
    pub feeds: Vec<Target>,

    #[serde(default = "defaults::releases")]
    pub releases: Vec<Target>,

    #[serde(default = "defaults::news")]
    pub news: Vec<Target>,

    #[serde(default = "defaults::direct")]
    pub direct: Vec<Target>,

    /// Search-style feeds of the social class
    #[serde(default = "defaults::aggregators")]
    pub aggregators: Vec<Target>,

    /// Account timelines of the social class
    #[serde(default = "defaults::timelines")]
    pub timelines: Vec<Target>,

    #[serde(default = "defaults::release_api_base")]
    pub release_api_base: String,

    #[serde(default = "defaults::timeline_api_base")]
    pub timeline_api_base: String,

    /// Timeline API token; timelines are skipped without one
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
}

impl SourcesConfig {
    /// Number of enabled targets across every class.
    pub fn enabled_count(&self) -> usize {
        [
            &self.feeds,
            &self.releases,
            &self.news,
            &self.direct,
            &self.aggregators,
            &self.timelines,
        ]
        .iter()
        .flat_map(|targets| targets.iter())
        .filter(|t| t.enabled)
        .count()
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            feeds: defaults::feeds(),
            releases: defaults::releases(),
            news: defaults::news(),
            direct: defaults::direct(),
            aggregators: defaults::aggregators(),
            timelines: defaults::timelines(),
            release_api_base: defaults::release_api_base(),
            timeline_api_base: defaults::timeline_api_base(),
            bearer_token: None,
        }
    }
}

/// Candidate caps and recency windows per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "defaults::release_limit")]
    pub releases: usize,

    #[serde(default = "defaults::news_limit")]
    pub news: usize,

    #[serde(default = "defaults::direct_limit")]
    pub direct: usize,

    #[serde(default = "defaults::aggregator_limit")]
    pub aggregators: usize,

    #[serde(default = "defaults::timeline_limit")]
    pub timelines: usize,

    /// Dated aggregator entries older than this are ignored
    #[serde(default = "defaults::aggregator_max_age_days")]
    pub aggregator_max_age_days: i64,

    /// Dated timeline posts older than this are ignored
    #[serde(default = "defaults::timeline_max_age_hours")]
    pub timeline_max_age_hours: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            releases: defaults::release_limit(),
            news: defaults::news_limit(),
            direct: defaults::direct_limit(),
            aggregators: defaults::aggregator_limit(),
            timelines: defaults::timeline_limit(),
            aggregator_max_age_days: defaults::aggregator_max_age_days(),
            timeline_max_age_hours: defaults::timeline_max_age_hours(),
        }
    }
}

mod defaults {
    use super::Target;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; feedwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }

    // Schedule defaults
    pub fn tick() -> u64 {
        60
    }
    pub fn feed_minutes() -> u64 {
        30
    }
    pub fn release_minutes() -> u64 {
        60
    }
    pub fn news_minutes() -> u64 {
        45
    }
    pub fn full_sweep_minutes() -> u64 {
        120
    }

    // Storage defaults
    pub fn database() -> String {
        "feedwatch.db".into()
    }
    pub fn retention_days() -> u32 {
        30
    }

    pub fn enabled() -> bool {
        true
    }

    // Email defaults
    pub fn smtp_server() -> String {
        "smtp.gmail.com".into()
    }
    pub fn smtp_port() -> u16 {
        587
    }

    // Extraction limits
    pub fn release_limit() -> usize {
        5
    }
    pub fn news_limit() -> usize {
        10
    }
    pub fn direct_limit() -> usize {
        5
    }
    pub fn aggregator_limit() -> usize {
        5
    }
    pub fn timeline_limit() -> usize {
        10
    }
    pub fn aggregator_max_age_days() -> i64 {
        7
    }
    pub fn timeline_max_age_hours() -> i64 {
        24
    }

    // API bases
    pub fn release_api_base() -> String {
        "https://api.github.com".into()
    }
    pub fn timeline_api_base() -> String {
        "https://api.twitter.com/2".into()
    }

    // Target defaults
    pub fn feeds() -> Vec<Target> {
        let ai = &[
            "ai",
            "artificial intelligence",
            "chatgpt",
            "claude",
            "cursor",
            "perplexity",
        ];
        vec![
            Target::new("OpenAI Blog", "https://openai.com/blog/rss.xml")
                .with_keywords(&["gpt", "chatgpt", "dalle", "api", "update", "release"]),
            Target::new(
                "AI News - MIT Technology Review",
                "https://www.technologyreview.com/feed/",
            )
            .with_keywords(ai),
            Target::new(
                "Hacker News - AI",
                "https://hnrss.org/frontpage?q=AI+OR+artificial+intelligence+OR+chatgpt+OR+claude+OR+cursor+OR+perplexity",
            )
            .with_keywords(ai),
        ]
    }

    pub fn releases() -> Vec<Target> {
        [
            "microsoft/vscode",
            "openai/openai-python",
            "microsoft/semantic-kernel",
            "langchain-ai/langchain",
        ]
        .into_iter()
        .map(|repo| Target::new(repo, repo))
        .collect()
    }

    pub fn news() -> Vec<Target> {
        let keywords = &["chatgpt", "cursor", "perplexity", "ai", "openai", "anthropic"];
        vec![
            Target::new(
                "AI News - The Verge",
                "https://www.theverge.com/ai-artificial-intelligence",
            )
            .with_selector("article h2 a")
            .with_keywords(keywords),
            Target::new(
                "TechCrunch AI",
                "https://techcrunch.com/category/artificial-intelligence/",
            )
            .with_selector("h2 a")
            .with_keywords(keywords),
        ]
    }

    pub fn direct() -> Vec<Target> {
        vec![
            Target::new("Anthropic News", "https://www.anthropic.com/news")
                .with_selector("h3 a, .card-title a, article h2 a")
                .with_keywords(&["claude", "update", "release", "new", "feature", "model"]),
            Target::new("Cursor AI", "https://cursor.sh/")
                .with_selector(".changelog, .updates, .news, h2, h3")
                .with_keywords(&["update", "release", "new", "feature", "changelog"]),
            Target::new("Perplexity Blog", "https://blog.perplexity.ai/")
                .with_selector("article h2, .blog-post-title, h1 a, .post-title")
                .with_keywords(&["update", "release", "new", "feature", "model"]),
            Target::new("OpenAI News", "https://openai.com/news/")
                .with_selector("h3 a, .card-title a, article h2 a")
                .with_keywords(&["gpt", "chatgpt", "dalle", "api", "update", "release"]),
        ]
    }

    pub fn aggregators() -> Vec<Target> {
        vec![
            Target::new(
                "AI Social Media Updates",
                "https://hnrss.org/frontpage?q=twitter%20AND%20(OpenAI%20OR%20Anthropic%20OR%20ChatGPT%20OR%20Claude)",
            )
            .with_keywords(&["twitter", "tweet", "openai", "anthropic", "chatgpt", "claude"]),
            Target::new(
                "Tech Twitter Discussions",
                "https://hnrss.org/newest?q=Sam%20Altman%20OR%20Dario%20Amodei%20OR%20AI%20twitter",
            )
            .with_keywords(&["sam altman", "dario amodei", "ai", "twitter", "ceo"]),
            Target::new(
                "OpenAI Twitter News",
                "https://news.google.com/rss/search?q=OpenAI%20twitter%20OR%20OpenAI%20tweets%20OR%20Sam%20Altman%20twitter",
            )
            .with_keywords(&["twitter", "tweet", "posts", "announces", "says", "x.com"])
            .with_limit(8),
            Target::new(
                "Anthropic Twitter News",
                "https://news.google.com/rss/search?q=Anthropic%20twitter%20OR%20Claude%20twitter%20OR%20Anthropic%20tweets",
            )
            .with_keywords(&["twitter", "tweet", "posts", "announces", "anthropic", "claude"])
            .with_limit(8),
        ]
    }

    pub fn timelines() -> Vec<Target> {
        vec![
            Target::new("X @OpenAI", "1358836358901501952")
                .with_handle("OpenAI")
                .with_keywords(&["gpt", "chatgpt", "dalle", "api", "update", "release"]),
            Target::new("X @AnthropicAI", "1397906446765400065")
                .with_handle("AnthropicAI")
                .with_keywords(&["claude", "ai", "update", "release", "model"]),
            Target::new("X @sama", "3456423612")
                .with_handle("sama")
                .with_keywords(&["openai", "ai", "gpt", "update"]),
        ]
    }
}
