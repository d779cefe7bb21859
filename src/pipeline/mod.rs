//! Monitoring pipeline.
//!
//! - `filter`: keyword gating of candidates
//! - `ingest`: discovery, dedup and insertion for one class
//! - `monitor`: notification, bookkeeping and retention around a run
//! - `scheduler`: interval jobs and the full reconciliation sweep

pub mod filter;
pub mod ingest;
pub mod monitor;
pub mod scheduler;

pub use filter::KeywordFilter;
pub use ingest::{ClassOutcome, IngestEngine};
pub use monitor::{FULL_SWEEP, Monitor};
pub use scheduler::{Job, JobRunner, Scheduler};
