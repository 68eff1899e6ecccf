//! SurrealDB-backed job repository.

use chrono::{DateTime, Utc};
use jobs_core::{JobId, JobMessage, JobRecord, JobStatus};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use super::{JobRepository, RepositoryError};
use crate::Database;

const TABLE: &str = "job";

/// Repository for job persistence in SurrealDB.
#[derive(Debug, Clone)]
pub struct SurrealJobRepository {
    db: Database,
}

/// Internal record type for SurrealDB.
///
/// `last_updated_us` mirrors `last_updated` as epoch microseconds so the
/// stale-job query compares numbers rather than formatted timestamps.
#[derive(Debug, Serialize, Deserialize)]
struct StoredJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    #[serde(flatten)]
    job: JobRecord,
    last_updated_us: i64,
}

impl From<JobRecord> for StoredJob {
    fn from(job: JobRecord) -> Self {
        Self {
            id: None,
            last_updated_us: job.last_updated.timestamp_micros(),
            job,
        }
    }
}

impl SurrealJobRepository {
    /// Wrap an open connection. The schema is expected to be in place, see
    /// [`crate::init_schema`].
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl JobRepository for SurrealJobRepository {
    async fn find_running_without_update_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let mut result = self
            .db
            .query(
                r#"
                SELECT * FROM job
                WHERE status = $status AND last_updated_us < $cutoff
                "#,
            )
            .bind(("status", JobStatus::Running.as_str()))
            .bind(("cutoff", cutoff.timestamp_micros()))
            .await?;

        let records: Vec<StoredJob> = result.take(0)?;

        Ok(records.into_iter().map(|r| r.job).collect())
    }

    async fn create_or_update(&self, record: JobRecord) -> Result<(), RepositoryError> {
        let job_id = record.job_id;

        // Read-then-write: good enough to stop the monitor from overwriting a
        // job that finished between the stale query and this call.
        if let Some(existing) = self.find_one(job_id).await?
            && existing.status.is_terminal()
        {
            return Err(RepositoryError::AlreadyTerminal(job_id));
        }

        let _: Option<StoredJob> = self
            .db
            .upsert((TABLE, job_id.to_string()))
            .content(StoredJob::from(record))
            .await?;

        Ok(())
    }

    async fn append_message(&self, job_id: JobId, message: JobMessage) -> Result<(), RepositoryError> {
        let mut result = self
            .db
            .query("UPDATE type::thing($table, $id) SET messages += $message")
            .bind(("table", TABLE))
            .bind(("id", job_id.to_string()))
            .bind(("message", message))
            .await?;

        // UPDATE never creates records, so no row back means the job is gone.
        let updated: Vec<StoredJob> = result.take(0)?;
        if updated.is_empty() {
            return Err(RepositoryError::NotFound(job_id));
        }

        Ok(())
    }

    async fn find_one(&self, job_id: JobId) -> Result<Option<JobRecord>, RepositoryError> {
        let record: Option<StoredJob> = self.db.select((TABLE, job_id.to_string())).await?;

        Ok(record.map(|r| r.job))
    }

    async fn find_all(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let records: Vec<StoredJob> = self.db.select(TABLE).await?;

        Ok(records.into_iter().map(|r| r.job).collect())
    }

    async fn remove(&self, job_id: JobId) -> Result<(), RepositoryError> {
        let _: Option<StoredJob> = self.db.delete((TABLE, job_id.to_string())).await?;

        Ok(())
    }
}
