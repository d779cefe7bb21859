// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;

// Re-export all public types
pub use config::{
    Config, EmailConfig, HttpConfig, LimitsConfig, NotifyConfig, ScheduleConfig, SourcesConfig,
    StorageConfig, Target, is_account_id,
};
pub use item::{
    Candidate, ItemId, NewItem, NotificationRecord, RunSummary, SeenItem, SourceClass,
};
