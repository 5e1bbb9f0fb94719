use super::store::{
    ExecutionStatus, JobExecution, JobRecord, JobStore, JobStoreError,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, query, query_as, FromRow};

/// Job definitions and history in the `scheduler_job` and
/// `scheduler_job_execution` tables.
pub struct PgJobStore {
    db: PgPool,
}

impl PgJobStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(FromRow)]
struct JobRow {
    id: String,
    trigger: String,
    max_instances: i32,
    next_run_time: Option<DateTime<Utc>>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        JobRecord {
            id: row.id,
            trigger: row.trigger,
            max_instances: row.max_instances,
            next_run_time: row.next_run_time,
        }
    }
}

#[derive(FromRow)]
struct ExecutionRow {
    id: i64,
    job_id: String,
    status: String,
    run_time: DateTime<Utc>,
    duration_ms: Option<i64>,
    exception: Option<String>,
}

impl TryFrom<ExecutionRow> for JobExecution {
    type Error = anyhow::Error;

    fn try_from(row: ExecutionRow) -> Result<Self> {
        Ok(JobExecution {
            id: row.id,
            job_id: row.job_id,
            status: row.status.parse()?,
            run_time: row.run_time,
            duration_ms: row.duration_ms,
            exception: row.exception,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn add_job(&self, record: JobRecord, replace_existing: bool) -> Result<()> {
        let sql = if replace_existing {
            "insert into scheduler_job (id, trigger, max_instances, next_run_time)
            values ($1, $2, $3, $4)
            on conflict (id) do update set
                trigger = excluded.trigger,
                max_instances = excluded.max_instances,
                next_run_time = excluded.next_run_time"
        } else {
            "insert into scheduler_job (id, trigger, max_instances, next_run_time)
            values ($1, $2, $3, $4)
            on conflict (id) do nothing"
        };
        let res = query(sql)
            .bind(&record.id)
            .bind(&record.trigger)
            .bind(record.max_instances)
            .bind(record.next_run_time)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(JobStoreError::ConflictingId(record.id).into());
        }

        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        let row = query_as::<_, JobRow>(
            "select id, trigger, max_instances, next_run_time
            from scheduler_job where id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(JobRecord::from))
    }

    async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let rows = query_as::<_, JobRow>(
            "select id, trigger, max_instances, next_run_time
            from scheduler_job order by id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(JobRecord::from).collect())
    }

    async fn set_next_run_time(
        &self,
        id: &str,
        next_run_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        query("update scheduler_job set next_run_time = $1 where id = $2")
            .bind(next_run_time)
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn start_execution(
        &self,
        job_id: &str,
        run_time: DateTime<Utc>,
    ) -> Result<i64> {
        let (id,): (i64,) = query_as(
            "insert into scheduler_job_execution (job_id, status, run_time)
            values ($1, $2, $3)
            returning id",
        )
        .bind(job_id)
        .bind(ExecutionStatus::Started.as_str())
        .bind(run_time)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn finish_execution(
        &self,
        id: i64,
        status: ExecutionStatus,
        duration_ms: i64,
        exception: Option<String>,
    ) -> Result<()> {
        query(
            "update scheduler_job_execution
            set status = $1, duration_ms = $2, exception = $3
            where id = $4",
        )
        .bind(status.as_str())
        .bind(duration_ms)
        .bind(exception)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn list_executions(&self, job_id: &str) -> Result<Vec<JobExecution>> {
        let rows = query_as::<_, ExecutionRow>(
            "select id, job_id, status, run_time, duration_ms, exception
            from scheduler_job_execution
            where job_id = $1
            order by run_time desc, id desc",
        )
        .bind(job_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(JobExecution::try_from).collect()
    }

    async fn delete_old_executions(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let res = query("delete from scheduler_job_execution where run_time <= $1")
            .bind(cutoff)
            .execute(&self.db)
            .await?;

        Ok(res.rows_affected())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
