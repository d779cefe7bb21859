//! feedwatch CLI
//!
//! Continuous monitoring, one-shot sweeps and store inspection.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use feedwatch::{
    error::{AppError, Result},
    models::{Config, SourceClass},
    pipeline::{Monitor, Scheduler},
};

/// feedwatch - keyword-filtered update monitor
#[derive(Parser, Debug)]
#[command(
    name = "feedwatch",
    version,
    about = "Polls feeds, releases, news pages and timelines for new matching items"
)]
struct Cli {
    /// Path to storage directory holding config.toml and the item database
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until Ctrl-C
    Run,

    /// Run one sweep and exit
    Once {
        /// Only this class (feed, repo_release, scraped_news, scraped_direct, social);
        /// a full reconciliation sweep when omitted
        #[arg(long)]
        class: Option<SourceClass>,
    },

    /// Send a synthetic item through every notification channel
    TestNotify,

    /// List items discovered recently
    Recent {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_recent(items: &[feedwatch::models::SeenItem], days: u32) {
    if items.is_empty() {
        println!("No items discovered in the last {days} days.");
        return;
    }
    println!("{} items discovered in the last {days} days:\n", items.len());
    for (i, item) in items.iter().enumerate() {
        println!("{:>3}. [{}] {}", i + 1, item.source_label(), item.title);
        if let Some(url) = &item.url {
            println!("     {url}");
        }
        println!(
            "     discovered {}{}",
            item.discovered_at.format("%Y-%m-%d %H:%M UTC"),
            if item.notified { "" } else { " (not yet notified)" }
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    config.apply_env_overrides();
    log::info!("Loaded configuration from {}", config_path.display());

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {e}");
            return Err(e);
        }
        log::info!(
            "Config OK: {} enabled targets",
            config.sources.enabled_count()
        );
        return Ok(());
    }

    config.validate()?;
    let monitor = Monitor::from_config(&config, &cli.storage_dir).await?;

    match cli.command {
        Command::Run => {
            let monitor = Arc::new(monitor);
            Scheduler::from_config(monitor, &config.schedule).run().await;
        }

        Command::Once { class: Some(class) } => {
            let summary = monitor.run_class(class).await;
            log::info!(
                "{class} sweep: {} new items from {} targets, {} errors",
                summary.new_items,
                summary.targets_attempted,
                summary.errors
            );
        }

        Command::Once { class: None } => {
            let summary = monitor.run_full().await;
            log::info!(
                "Full sweep: {} new items from {} targets, {} errors",
                summary.new_items,
                summary.targets_attempted,
                summary.errors
            );
        }

        Command::TestNotify => {
            if !monitor.send_test_notification().await {
                return Err(AppError::notify("all", "no channel delivered the test notification"));
            }
            log::info!("Test notification delivered");
        }

        Command::Recent { days } => {
            print_recent(&monitor.recent(days).await, days);
        }

        Command::Validate => {}
    }

    Ok(())
}
