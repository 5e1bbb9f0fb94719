use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job was cancelled")]
    Cancelled,
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Handed to every run of a job.
#[derive(Clone)]
pub struct JobContext {
    pub cancellation_token: CancellationToken,
}

impl JobContext {
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self { cancellation_token }
    }

    /// Long-running jobs should check this and bail out with
    /// `JobError::Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

#[async_trait]
pub trait Job: Send + Sync {
    /// Unique identifier, also the primary key in the job store.
    fn id(&self) -> &'static str;

    /// Cron expression with a leading seconds field, e.g. `0 0 8 * * Mon`.
    fn trigger(&self) -> &'static str;

    /// How many runs of this job may overlap.
    fn max_instances(&self) -> u32 {
        1
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError>;
}

/// A cron schedule evaluated in a fixed UTC offset, so `0 0 8 * * Mon` means
/// Monday 08:00 local time rather than UTC.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    schedule: Schedule,
    tz: FixedOffset,
}

impl CronTrigger {
    pub fn parse(expr: &str, tz: FixedOffset) -> Result<Self, cron::error::Error> {
        Ok(Self {
            schedule: Schedule::from_str(expr)?,
            tz,
        })
    }

    /// First firing strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.tz))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }
}
