//! Cron runner for the periodic jobs. Runs as its own process
//! (`board scheduler`), separate from the web server.

pub mod job;
pub mod jobs;
pub mod pg_store;
pub mod store;

use chrono::{DateTime, FixedOffset, Utc};
use job::{CronTrigger, Job, JobContext};
use std::{
    fmt::Write,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Instant,
};
use store::{ExecutionStatus, JobExecution, JobRecord, JobStore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long to sleep when nothing is scheduled at all.
const IDLE_POLL: std::time::Duration = std::time::Duration::from_secs(60);

struct ScheduledJob {
    job: Arc<dyn Job>,
    trigger: CronTrigger,
    running: Arc<AtomicU32>,
    next_run_time: Option<DateTime<Utc>>,
}

/// Releases a `max_instances` slot when the run ends, panics included.
struct RunSlot(Arc<AtomicU32>);

impl RunSlot {
    fn claim(running: &Arc<AtomicU32>, max_instances: u32) -> Option<Self> {
        running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max_instances).then_some(n + 1)
            })
            .ok()
            .map(|_| RunSlot(running.clone()))
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Scheduler {
    store: Arc<dyn JobStore>,
    tz: FixedOffset,
    jobs: Vec<ScheduledJob>,
    in_flight: JoinSet<()>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(store: Arc<dyn JobStore>, tz: FixedOffset) -> Self {
        Self {
            store,
            tz,
            jobs: Vec::new(),
            in_flight: JoinSet::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops the runner. Running jobs see it through
    /// `JobContext::is_cancelled`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register a job and persist its definition. The next run time is
    /// computed from now, so firings missed while the process was down are
    /// not replayed.
    pub async fn add_job(
        &mut self,
        job: Arc<dyn Job>,
        replace_existing: bool,
    ) -> anyhow::Result<()> {
        let trigger = CronTrigger::parse(job.trigger(), self.tz)?;
        let next_run_time = trigger.next_after(Utc::now());
        let previous = self.store.get_job(job.id()).await?;
        self.store
            .add_job(
                JobRecord {
                    id: job.id().to_string(),
                    trigger: job.trigger().to_string(),
                    max_instances: i32::try_from(job.max_instances())?,
                    next_run_time,
                },
                replace_existing,
            )
            .await?;

        if let Some(previous) = previous.filter(|p| p.trigger != job.trigger()) {
            info!(
                job_id = job.id(),
                from = %previous.trigger,
                to = job.trigger(),
                "job trigger changed"
            );
        }
        info!(job_id = job.id(), trigger = job.trigger(), ?next_run_time, "job registered");
        self.jobs.retain(|j| j.job.id() != job.id());
        self.jobs.push(ScheduledJob {
            job,
            trigger,
            running: Arc::new(AtomicU32::new(0)),
            next_run_time,
        });

        Ok(())
    }

    /// Fire every job whose next run time has come, then move each of them
    /// to its following firing. Returns how many runs were actually started.
    pub async fn run_due(&mut self, now: DateTime<Utc>) -> usize {
        let mut started = 0;
        for entry in self.jobs.iter_mut() {
            let Some(run_time) = entry.next_run_time.filter(|t| *t <= now) else {
                continue;
            };
            let job_id = entry.job.id();

            match RunSlot::claim(&entry.running, entry.job.max_instances()) {
                Some(slot) => {
                    let store = self.store.clone();
                    let job = entry.job.clone();
                    let ctx = JobContext::new(self.shutdown.child_token());
                    self.in_flight.spawn(async move {
                        execute(store, job, ctx, run_time).await;
                        drop(slot);
                    });
                    started += 1;
                }
                None => warn!(
                    job_id,
                    %run_time,
                    "maximum number of running instances reached, skipping run"
                ),
            }

            entry.next_run_time = entry.trigger.next_after(now);
            if let Err(e) = self
                .store
                .set_next_run_time(job_id, entry.next_run_time)
                .await
            {
                error!(job_id, "could not persist next run time: {e:#}");
            }
        }

        started
    }

    fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.jobs.iter().filter_map(|j| j.next_run_time).min()
    }

    /// Wait for every started run to finish.
    pub async fn drain(&mut self) {
        while let Some(res) = self.in_flight.join_next().await {
            if let Err(e) = res {
                error!("job task panicked: {e}");
            }
        }
    }

    /// Block until the shutdown token is cancelled. Then stop firing, wait
    /// for in-flight runs and close the store.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(jobs = self.jobs.len(), "scheduler started");
        let shutdown = self.shutdown.clone();
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            self.run_due(Utc::now()).await;

            let sleep_for = self
                .next_wakeup()
                .map(until)
                .unwrap_or(IDLE_POLL)
                .min(IDLE_POLL);
            debug!(?sleep_for, "scheduler sleeping");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(sleep_for) => {}
                Some(res) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = res {
                        error!("job task panicked: {e}");
                    }
                }
            }
        }

        info!(in_flight = self.in_flight.len(), "scheduler shutting down");
        self.drain().await;
        self.store.close().await;
        info!("scheduler stopped");

        Ok(())
    }
}

/// Time left until `at`; zero once it has passed.
fn until(at: DateTime<Utc>) -> std::time::Duration {
    (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO)
}

/// Plain-text summary of the registered jobs and their latest runs, newest
/// first. Backs `board jobs`.
pub async fn status_report(
    store: &dyn JobStore,
    runs_per_job: usize,
) -> anyhow::Result<String> {
    let newest_first = |a: &JobExecution, b: &JobExecution| {
        b.run_time.cmp(&a.run_time).then(b.id.cmp(&a.id))
    };
    let mut out = String::new();
    let mut runs = Vec::new();
    for job in store.list_jobs().await? {
        let next = job
            .next_run_time
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
        writeln!(
            out,
            "{} [{}] max_instances={} next={next}",
            job.id, job.trigger, job.max_instances
        )?;
        let mut executions = store.list_executions(&job.id).await?;
        executions.sort_by(newest_first);
        executions.truncate(runs_per_job);
        runs.extend(executions);
    }
    if runs.is_empty() {
        return Ok(out);
    }

    runs.sort_by(newest_first);
    writeln!(out, "\nrecent runs:")?;
    for run in runs {
        let duration = run
            .duration_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));
        write!(
            out,
            "{} {} #{} {} {duration}",
            run.run_time.to_rfc3339(),
            run.job_id,
            run.id,
            run.status.as_str()
        )?;
        if let Some(exception) = &run.exception {
            write!(out, " {exception}")?;
        }
        out.push('\n');
    }

    Ok(out)
}

async fn execute(
    store: Arc<dyn JobStore>,
    job: Arc<dyn Job>,
    ctx: JobContext,
    run_time: DateTime<Utc>,
) {
    let job_id = job.id();
    let execution_id = match store.start_execution(job_id, run_time).await {
        Ok(id) => Some(id),
        Err(e) => {
            error!(job_id, "could not record job start: {e:#}");
            None
        }
    };

    info!(job_id, %run_time, "running job");
    let started = Instant::now();
    let result = job.run(&ctx).await;
    let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    let (status, exception) = match result {
        Ok(()) => {
            info!(job_id, duration_ms, "job succeeded");
            (ExecutionStatus::Success, None)
        }
        Err(e) => {
            error!(job_id, duration_ms, "job failed: {e}");
            (ExecutionStatus::Error, Some(e.to_string()))
        }
    };

    if let Some(id) = execution_id {
        if let Err(e) = store
            .finish_execution(id, status, duration_ms, exception)
            .await
        {
            error!(job_id, "could not record job result: {e:#}");
        }
    }
}
