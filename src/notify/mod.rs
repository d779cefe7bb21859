//! Notification fan-out.
//!
//! Every new-item batch goes to all channels concurrently. A batch counts
//! as delivered when at least one channel accepted it.

pub mod console;
#[cfg(feature = "email")]
pub mod email;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::Result;
use crate::models::{NotifyConfig, RunSummary, SeenItem};
use crate::utils::text::truncate;

pub use console::ConsoleChannel;
#[cfg(feature = "email")]
pub use email::EmailChannel;

/// Content preview length in rendered notifications.
const PREVIEW_CHARS: usize = 100;

/// A notification transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable label recorded in the notification history.
    fn name(&self) -> &str;

    /// Deliver a non-empty batch of new items.
    async fn send_items(&self, items: &[SeenItem]) -> Result<()>;

    /// Deliver the end-of-run summary. Channels that only announce items
    /// can ignore it.
    async fn send_summary(&self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }
}

/// Outcome of one channel for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
}

/// All configured channels.
#[derive(Default)]
pub struct Notifier {
    channels: Vec<Box<dyn Channel>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: impl Channel + 'static) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Build the channel set from configuration.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let mut notifier = Self::new();
        if config.console {
            notifier = notifier.with_channel(ConsoleChannel);
        }

        if config.email.enabled {
            #[cfg(feature = "email")]
            {
                notifier = notifier.with_channel(EmailChannel::from_config(&config.email)?);
            }
            #[cfg(not(feature = "email"))]
            log::warn!("Email notifications are enabled but this build lacks the `email` feature");
        }

        if notifier.channels.is_empty() {
            log::warn!("No notification channels configured; new items will stay unnotified");
        }
        Ok(notifier)
    }

    /// Send `items` over every channel and report each channel's outcome.
    pub async fn dispatch(&self, items: &[SeenItem]) -> Vec<ChannelReport> {
        if items.is_empty() {
            return Vec::new();
        }

        let sends = self.channels.iter().map(|channel| async move {
            match channel.send_items(items).await {
                Ok(()) => ChannelReport {
                    channel: channel.name().to_string(),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    log::error!("Notification channel {} failed: {e}", channel.name());
                    ChannelReport {
                        channel: channel.name().to_string(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        });
        let reports = join_all(sends).await;

        log::info!(
            "Notifications sent: {}/{} channels successful",
            reports.iter().filter(|r| r.success).count(),
            reports.len()
        );
        reports
    }

    /// Whether a set of reports amounts to a delivered batch.
    pub fn delivered(reports: &[ChannelReport]) -> bool {
        reports.iter().any(|r| r.success)
    }

    /// Hand the run summary to every channel; failures are only logged.
    pub async fn summarize(&self, summary: &RunSummary) {
        let sends = self.channels.iter().map(|channel| async move {
            if let Err(e) = channel.send_summary(summary).await {
                log::warn!("Summary on channel {} failed: {e}", channel.name());
            }
        });
        join_all(sends).await;
    }
}

/// Plain-text block for one item, shared by the text channels.
pub fn render_item(item: &SeenItem) -> String {
    let mut out = format!("Source: {}\nTitle: {}\n", item.source_label(), item.title);
    if !item.content.is_empty() {
        out.push_str(&format!("Content: {}\n", truncate(&item.content, PREVIEW_CHARS)));
    }
    if let Some(url) = &item.url {
        out.push_str(&format!("URL: {url}\n"));
    }
    if let Some(published) = item.published_at {
        out.push_str(&format!("Published: {}\n", published.format("%Y-%m-%d %H:%M UTC")));
    }
    out
}

/// Plain-text rendering of a run summary.
pub fn render_summary(summary: &RunSummary) -> String {
    format!(
        "Run '{}' complete: {} new items, {} sources checked, {} errors, finished at {}",
        summary.job,
        summary.new_items,
        summary.targets_attempted,
        summary.errors,
        summary.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
