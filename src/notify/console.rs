// src/notify/console.rs

//! Console channel: writes through the logging facade.

use async_trait::async_trait;

use super::{Channel, render_item, render_summary};
use crate::error::Result;
use crate::models::{RunSummary, SeenItem};

const RULE: &str = "============================================================";

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleChannel;

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_items(&self, items: &[SeenItem]) -> Result<()> {
        log::info!("{RULE}");
        log::info!("NEW UPDATES DETECTED - {} items", items.len());
        log::info!("{RULE}");
        for item in items {
            for line in render_item(item).lines() {
                log::info!("{line}");
            }
            log::info!("{}", "-".repeat(40));
        }
        Ok(())
    }

    async fn send_summary(&self, summary: &RunSummary) -> Result<()> {
        log::info!("{}", render_summary(summary));
        Ok(())
    }
}
