use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use std::{collections::BTreeMap, sync::Mutex};

/// Durable definition of a scheduled job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: String,
    pub trigger: String,
    pub max_instances: i32,
    pub next_run_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Started,
    Success,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "started" => Ok(Self::Started),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(anyhow::anyhow!("unknown execution status {other:?}")),
        }
    }
}

/// One run of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobExecution {
    pub id: i64,
    pub job_id: String,
    pub status: ExecutionStatus,
    pub run_time: DateTime<Utc>,
    pub duration_ms: Option<i64>,
    pub exception: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("a job with id {0:?} already exists")]
    ConflictingId(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// With `replace_existing`, an existing definition under the same id is
    /// overwritten. Without it, a duplicate id fails with
    /// `JobStoreError::ConflictingId`.
    async fn add_job(&self, record: JobRecord, replace_existing: bool) -> Result<()>;
    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>>;
    async fn list_jobs(&self) -> Result<Vec<JobRecord>>;
    async fn set_next_run_time(
        &self,
        id: &str,
        next_run_time: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Record the beginning of a run; returns the execution id.
    async fn start_execution(
        &self,
        job_id: &str,
        run_time: DateTime<Utc>,
    ) -> Result<i64>;

    /// Finishing an execution that has already been pruned is a no-op.
    async fn finish_execution(
        &self,
        id: i64,
        status: ExecutionStatus,
        duration_ms: i64,
        exception: Option<String>,
    ) -> Result<()>;

    async fn list_executions(&self, job_id: &str) -> Result<Vec<JobExecution>>;

    /// Delete every execution with `run_time <= cutoff`, returning how many
    /// went.
    async fn delete_old_executions(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Release underlying resources. Called once on scheduler shutdown.
    async fn close(&self) {}
}

#[cfg(test)]
#[derive(Default)]
struct Inner {
    jobs: BTreeMap<String, JobRecord>,
    executions: Vec<JobExecution>,
    last_execution_id: i64,
}

/// Keeps everything in process memory, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

#[cfg(test)]
impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("job store lock poisoned"))
    }
}

#[cfg(test)]
#[async_trait]
impl JobStore for MemoryJobStore {
    async fn add_job(&self, record: JobRecord, replace_existing: bool) -> Result<()> {
        let mut inner = self.lock()?;
        if !replace_existing && inner.jobs.contains_key(&record.id) {
            return Err(JobStoreError::ConflictingId(record.id).into());
        }
        inner.jobs.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.lock()?.jobs.get(id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        Ok(self.lock()?.jobs.values().cloned().collect())
    }

    async fn set_next_run_time(
        &self,
        id: &str,
        next_run_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if let Some(job) = self.lock()?.jobs.get_mut(id) {
            job.next_run_time = next_run_time;
        }
        Ok(())
    }

    async fn start_execution(
        &self,
        job_id: &str,
        run_time: DateTime<Utc>,
    ) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.last_execution_id += 1;
        let id = inner.last_execution_id;
        inner.executions.push(JobExecution {
            id,
            job_id: job_id.to_string(),
            status: ExecutionStatus::Started,
            run_time,
            duration_ms: None,
            exception: None,
        });
        Ok(id)
    }

    async fn finish_execution(
        &self,
        id: i64,
        status: ExecutionStatus,
        duration_ms: i64,
        exception: Option<String>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(execution) = inner.executions.iter_mut().find(|e| e.id == id) {
            execution.status = status;
            execution.duration_ms = Some(duration_ms);
            execution.exception = exception;
        }
        Ok(())
    }

    async fn list_executions(&self, job_id: &str) -> Result<Vec<JobExecution>> {
        Ok(self
            .lock()?
            .executions
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn delete_old_executions(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.lock()?;
        let before = inner.executions.len();
        inner.executions.retain(|e| e.run_time > cutoff);
        Ok((before - inner.executions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: &str, trigger: &str) -> JobRecord {
        JobRecord {
            id: id.into(),
            trigger: trigger.into(),
            max_instances: 1,
            next_run_time: None,
        }
    }

    #[tokio::test]
    async fn test_replace_existing_leaves_one_definition() {
        let store = MemoryJobStore::new();
        store.add_job(record("sender", "0 0 8 * * Mon"), true).await.unwrap();
        store.add_job(record("sender", "0 0 9 * * Mon"), true).await.unwrap();

        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].trigger, "0 0 9 * * Mon");
    }

    #[tokio::test]
    async fn test_duplicate_id_without_replace_conflicts() {
        let store = MemoryJobStore::new();
        store.add_job(record("sender", "0 0 8 * * Mon"), false).await.unwrap();
        let err = store
            .add_job(record("sender", "0 0 9 * * Mon"), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JobStoreError>(),
            Some(JobStoreError::ConflictingId(id)) if id == "sender"
        ));
        let job = store.get_job("sender").await.unwrap().unwrap();
        assert_eq!(job.trigger, "0 0 8 * * Mon");
    }

    #[tokio::test]
    async fn test_execution_lifecycle() {
        let store = MemoryJobStore::new();
        let id = store.start_execution("sender", Utc::now()).await.unwrap();
        store
            .finish_execution(id, ExecutionStatus::Error, 12, Some("boom".into()))
            .await
            .unwrap();

        let runs = store.list_executions("sender").await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, ExecutionStatus::Error);
        assert_eq!(runs[0].duration_ms, Some(12));
        assert_eq!(runs[0].exception.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_delete_old_executions_is_inclusive() {
        let store = MemoryJobStore::new();
        let now = Utc::now();
        store.start_execution("a", now - Duration::days(8)).await.unwrap();
        store.start_execution("a", now - Duration::days(7)).await.unwrap();
        store.start_execution("a", now - Duration::days(1)).await.unwrap();

        let deleted = store
            .delete_old_executions(now - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        let left = store.list_executions("a").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].run_time, now - Duration::days(1));
    }

    #[test]
    fn test_status_strings() {
        for status in [
            ExecutionStatus::Started,
            ExecutionStatus::Success,
            ExecutionStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<ExecutionStatus>().unwrap(), status);
        }
        assert!("done".parse::<ExecutionStatus>().is_err());
    }
}
