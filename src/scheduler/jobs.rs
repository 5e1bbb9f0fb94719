//! The jobs the `scheduler` subcommand registers.

use super::{
    job::{Job, JobContext, JobError},
    store::JobStore,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// Weekly digest email. Nothing is sent yet; the run is only logged.
pub struct SenderJob;

#[async_trait]
impl Job for SenderJob {
    fn id(&self) -> &'static str {
        "sender"
    }

    fn trigger(&self) -> &'static str {
        "0 0 8 * * Mon"
    }

    async fn run(&self, _ctx: &JobContext) -> Result<(), JobError> {
        info!("weekly digest: nothing to send");
        Ok(())
    }
}

/// Prunes the scheduler's own execution history.
pub struct CleanupJob {
    store: Arc<dyn JobStore>,
    max_age_secs: u64,
}

impl CleanupJob {
    pub fn new(store: Arc<dyn JobStore>, max_age_secs: u64) -> Self {
        Self {
            store,
            max_age_secs,
        }
    }
}

#[async_trait]
impl Job for CleanupJob {
    fn id(&self) -> &'static str {
        "delete_old_job_executions"
    }

    fn trigger(&self) -> &'static str {
        "0 0 0 * * Mon"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        let max_age = std::time::Duration::from_secs(self.max_age_secs);
        let cutoff = Duration::from_std(max_age)
            .ok()
            .and_then(|max_age| Utc::now().checked_sub_signed(max_age))
            .ok_or_else(|| {
                JobError::ExecutionFailed(format!(
                    "max age of {}s is out of range",
                    self.max_age_secs
                ))
            })?;

        let deleted = self.store.delete_old_executions(cutoff).await?;
        info!(deleted, %cutoff, "deleted old job executions");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DEFAULT_CLEANUP_MAX_AGE_SECS, scheduler::store::MemoryJobStore};
    use tokio_util::sync::CancellationToken;

    fn ctx() -> JobContext {
        JobContext::new(CancellationToken::new())
    }

    #[tokio::test]
    async fn test_zero_max_age_deletes_everything() {
        let store = Arc::new(MemoryJobStore::new());
        let now = Utc::now();
        store.start_execution("sender", now - Duration::days(30)).await.unwrap();
        store.start_execution("sender", now - Duration::seconds(1)).await.unwrap();
        store.start_execution("sender", now).await.unwrap();

        CleanupJob::new(store.clone(), 0).run(&ctx()).await.unwrap();

        assert!(store.list_executions("sender").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_max_age_keeps_last_week() {
        let store = Arc::new(MemoryJobStore::new());
        let now = Utc::now();
        store.start_execution("sender", now - Duration::days(8)).await.unwrap();
        store.start_execution("sender", now - Duration::days(6)).await.unwrap();
        store.start_execution("sender", now - Duration::hours(1)).await.unwrap();

        CleanupJob::new(store.clone(), DEFAULT_CLEANUP_MAX_AGE_SECS)
            .run(&ctx())
            .await
            .unwrap();

        let left = store.list_executions("sender").await.unwrap();
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|e| e.run_time > now - Duration::days(7)));
    }

    #[tokio::test]
    async fn test_cleanup_respects_cancellation() {
        let store = Arc::new(MemoryJobStore::new());
        store.start_execution("sender", Utc::now()).await.unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let res = CleanupJob::new(store.clone(), 0)
            .run(&JobContext::new(token))
            .await;
        assert!(matches!(res, Err(JobError::Cancelled)));
        assert_eq!(store.list_executions("sender").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_huge_max_age_fails_without_deleting() {
        let store = Arc::new(MemoryJobStore::new());
        store.start_execution("sender", Utc::now()).await.unwrap();

        let res = CleanupJob::new(store.clone(), 10_000_000_000_000)
            .run(&ctx())
            .await;
        assert!(matches!(res, Err(JobError::ExecutionFailed(_))));
        assert_eq!(store.list_executions("sender").await.unwrap().len(), 1);

        let res = CleanupJob::new(store.clone(), u64::MAX).run(&ctx()).await;
        assert!(matches!(res, Err(JobError::ExecutionFailed(_))));
    }

    #[tokio::test]
    async fn test_sender_is_a_noop() {
        assert!(SenderJob.run(&ctx()).await.is_ok());
    }
}
