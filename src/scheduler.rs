//! Timer-driven background jobs
//!
//! Each job pairs an interval with an async closure and carries an
//! active-run guard: a tick that fires while the previous run is still
//! executing is skipped, never queued. Jobs can be invoked directly via
//! `run_once`, so tests exercise them without waiting on wall-clock
//! time.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

type JobFn = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct Job {
    name: &'static str,
    interval: Duration,
    running: AtomicBool,
    run: JobFn,
}

impl Job {
    pub fn new<F>(name: &'static str, interval: Duration, run: F) -> Arc<Self>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name,
            interval,
            running: AtomicBool::new(false),
            run: Box::new(run),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the job now unless a previous run is still active. Returns
    /// whether the job actually ran.
    pub async fn run_once(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(job = self.name, "previous run still active, skipping");
            return false;
        }

        debug!(job = self.name, "job started");
        (self.run)().await;
        self.running.store(false, Ordering::SeqCst);
        debug!(job = self.name, "job finished");
        true
    }
}

/// Registry of recurring jobs, each spawned as a detached timer task.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Arc<Job>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn register(&mut self, job: Arc<Job>) {
        self.jobs.push(job);
    }

    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|job| {
                let job = Arc::clone(job);
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(job.interval);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                    // The first tick completes immediately; the initial
                    // run happens at startup, not here
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        debug!(job = job.name, "scheduled run triggered");
                        job.run_once().await;
                    }
                })
            })
            .collect()
    }
}
