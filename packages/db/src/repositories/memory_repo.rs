//! Process-local job repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use jobs_core::{JobId, JobMessage, JobRecord};
use tokio::sync::RwLock;

use super::{JobRepository, RepositoryError};

/// Job repository kept in memory behind an async lock.
#[derive(Debug, Default)]
pub struct InMemJobRepository {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub async fn size(&self) -> usize {
        self.jobs.read().await.len()
    }
}

impl JobRepository for InMemJobRepository {
    async fn find_running_without_update_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .filter(|job| job.is_running() && job.last_updated < cutoff)
            .cloned()
            .collect())
    }

    async fn create_or_update(&self, record: JobRecord) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.get(&record.job_id)
            && existing.status.is_terminal()
        {
            return Err(RepositoryError::AlreadyTerminal(record.job_id));
        }
        jobs.insert(record.job_id, record);
        Ok(())
    }

    async fn append_message(&self, job_id: JobId, message: JobMessage) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or(RepositoryError::NotFound(job_id))?;
        job.messages.push(message);
        Ok(())
    }

    async fn find_one(&self, job_id: JobId) -> Result<Option<JobRecord>, RepositoryError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        Ok(self.jobs.read().await.values().cloned().collect())
    }

    async fn remove(&self, job_id: JobId) -> Result<(), RepositoryError> {
        self.jobs.write().await.remove(&job_id);
        Ok(())
    }
}
