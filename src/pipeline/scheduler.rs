// src/pipeline/scheduler.rs

//! Interval scheduler.
//!
//! One control loop wakes every tick and starts each due job whose
//! previous run has finished. A due job that is still running stays due
//! and starts on the first tick after it completes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::monitor::{FULL_SWEEP, Monitor};
use crate::models::{RunSummary, ScheduleConfig, SourceClass};

/// A schedulable unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Class(SourceClass),
    FullSweep,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Class(class) => write!(f, "{class}"),
            Job::FullSweep => f.write_str(FULL_SWEEP),
        }
    }
}

/// Executes jobs for the scheduler.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run_job(&self, job: Job) -> RunSummary;
}

#[async_trait]
impl JobRunner for Monitor {
    async fn run_job(&self, job: Job) -> RunSummary {
        match job {
            Job::Class(class) => self.run_class(class).await,
            Job::FullSweep => self.run_full().await,
        }
    }
}

struct Slot {
    job: Job,
    period: Duration,
    next_due: Instant,
    handle: Option<JoinHandle<()>>,
}

impl Slot {
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

pub struct Scheduler {
    runner: Arc<dyn JobRunner>,
    tick: Duration,
    slots: Vec<Slot>,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn JobRunner>, tick: Duration) -> Self {
        Self {
            runner,
            tick,
            slots: Vec::new(),
        }
    }

    /// Register `job` to run every `period`, first at `first_due`.
    pub fn add_job(&mut self, job: Job, period: Duration, first_due: Instant) {
        self.slots.push(Slot {
            job,
            period,
            next_due: first_due,
            handle: None,
        });
    }

    /// The configured schedule: the full sweep right away, then each class
    /// with an interval after one period.
    pub fn from_config(runner: Arc<dyn JobRunner>, config: &ScheduleConfig) -> Self {
        let now = Instant::now();
        let mut scheduler = Self::new(runner, config.tick());
        scheduler.add_job(Job::FullSweep, config.full_sweep(), now);
        for class in SourceClass::ALL {
            match config.interval(class) {
                Some(period) => scheduler.add_job(Job::Class(class), period, now + period),
                None => log::info!("No interval for {class}; covered by the full sweep only"),
            }
        }
        scheduler
    }

    pub fn jobs(&self) -> Vec<(Job, Duration)> {
        self.slots.iter().map(|s| (s.job, s.period)).collect()
    }

    pub fn is_running(&self, job: Job) -> bool {
        self.slots.iter().any(|s| s.job == job && s.is_running())
    }

    /// Start every due job that is not already running; returns the
    /// jobs started.
    pub fn tick(&mut self, now: Instant) -> Vec<Job> {
        let mut started = Vec::new();
        for slot in &mut self.slots {
            if now < slot.next_due {
                continue;
            }
            if slot.is_running() {
                log::debug!("Job {} is due but still running; skipping", slot.job);
                continue;
            }

            let runner = Arc::clone(&self.runner);
            let job = slot.job;
            log::info!("Starting {job} job");
            slot.handle = Some(tokio::spawn(async move {
                let summary = runner.run_job(job).await;
                log::info!(
                    "Job {job} finished: {} new items, {} errors",
                    summary.new_items,
                    summary.errors
                );
            }));
            slot.next_due = now + slot.period;
            started.push(job);
        }
        started
    }

    /// Drive the loop until `shutdown` resolves, then wait for running jobs.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.tick);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.tick(Instant::now());
                }
            }
        }

        log::info!("Scheduler stopping; waiting for running jobs");
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                if let Err(e) = handle.await {
                    log::error!("Job {} ended abnormally: {e}", slot.job);
                }
            }
        }
    }

    /// Run until Ctrl-C.
    pub async fn run(self) {
        log::info!(
            "Scheduler started with {} jobs, tick every {}s",
            self.slots.len(),
            self.tick.as_secs()
        );
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// Runner whose jobs block until a permit is released.
    struct GatedRunner {
        gate: Semaphore,
        started: Mutex<Vec<Job>>,
    }

    impl GatedRunner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                started: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl JobRunner for GatedRunner {
        async fn run_job(&self, job: Job) -> RunSummary {
            self.started.lock().unwrap().push(job);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            RunSummary {
                job: job.to_string(),
                new_items: 0,
                targets_attempted: 0,
                errors: 0,
                completed_at: Utc::now(),
            }
        }
    }

    async fn wait_until_idle(scheduler: &Scheduler, job: Job) {
        while scheduler.is_running(job) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn running_job_is_not_restarted() {
        let runner = GatedRunner::new();
        let mut scheduler = Scheduler::new(runner.clone(), Duration::from_secs(60));
        let start = Instant::now();
        let job = Job::Class(SourceClass::Feed);
        scheduler.add_job(job, Duration::from_secs(60), start);

        assert_eq!(scheduler.tick(start), vec![job]);
        assert!(scheduler.is_running(job));

        // Due again, but the first run is still blocked.
        assert!(scheduler.tick(start + Duration::from_secs(120)).is_empty());

        runner.gate.add_permits(1);
        wait_until_idle(&scheduler, job).await;
        assert_eq!(scheduler.tick(start + Duration::from_secs(120)), vec![job]);

        runner.gate.add_permits(1);
        wait_until_idle(&scheduler, job).await;
        assert_eq!(runner.started.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn jobs_wait_for_their_period() {
        let runner = GatedRunner::new();
        runner.gate.add_permits(10);
        let mut scheduler = Scheduler::new(runner.clone(), Duration::from_secs(60));
        let start = Instant::now();
        scheduler.add_job(Job::FullSweep, Duration::from_secs(7200), start);
        scheduler.add_job(
            Job::Class(SourceClass::RepoRelease),
            Duration::from_secs(3600),
            start + Duration::from_secs(3600),
        );

        assert_eq!(scheduler.tick(start), vec![Job::FullSweep]);
        wait_until_idle(&scheduler, Job::FullSweep).await;
        assert!(scheduler.tick(start + Duration::from_secs(60)).is_empty());
        assert_eq!(
            scheduler.tick(start + Duration::from_secs(3600)),
            vec![Job::Class(SourceClass::RepoRelease)]
        );
    }

    #[tokio::test]
    async fn different_jobs_may_overlap() {
        let runner = GatedRunner::new();
        let mut scheduler = Scheduler::new(runner.clone(), Duration::from_secs(60));
        let start = Instant::now();
        scheduler.add_job(Job::Class(SourceClass::Feed), Duration::from_secs(60), start);
        scheduler.add_job(Job::FullSweep, Duration::from_secs(60), start);

        assert_eq!(scheduler.tick(start).len(), 2);
        assert!(scheduler.is_running(Job::Class(SourceClass::Feed)));
        assert!(scheduler.is_running(Job::FullSweep));
        runner.gate.add_permits(2);
    }

    #[tokio::test]
    async fn default_schedule_skips_classes_without_interval() {
        let runner = GatedRunner::new();
        let scheduler = Scheduler::from_config(runner, &ScheduleConfig::default());
        let jobs: Vec<Job> = scheduler.jobs().into_iter().map(|(job, _)| job).collect();

        assert_eq!(
            jobs,
            vec![
                Job::FullSweep,
                Job::Class(SourceClass::Feed),
                Job::Class(SourceClass::RepoRelease),
                Job::Class(SourceClass::ScrapedNews),
            ]
        );
    }
}
