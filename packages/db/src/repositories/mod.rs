//! The job registry contract and its implementations.

mod job_repo;
mod memory_repo;

use std::future::Future;

use chrono::{DateTime, Utc};
use jobs_core::{JobId, JobMessage, JobRecord};
use thiserror::Error;

pub use job_repo::SurrealJobRepository;
pub use memory_repo::InMemJobRepository;

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Job not found: {0}")]
    NotFound(JobId),
    #[error("Job {0} already reached a terminal status")]
    AlreadyTerminal(JobId),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
}

/// Storage for job records and their message logs.
///
/// Implementations must tolerate concurrent callers; the monitor never
/// assumes it is the only writer.
pub trait JobRepository: Send + Sync {
    /// Running jobs whose `last_updated` is strictly before `cutoff`.
    fn find_running_without_update_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<JobRecord>, RepositoryError>> + Send;

    /// Replace the stored record with `record`, inserting it if absent.
    ///
    /// Fails with [`RepositoryError::AlreadyTerminal`] if the stored version
    /// has already stopped.
    fn create_or_update(
        &self,
        record: JobRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a message to the job's log.
    fn append_message(
        &self,
        job_id: JobId,
        message: JobMessage,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find_one(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = Result<Option<JobRecord>, RepositoryError>> + Send;

    fn find_all(&self) -> impl Future<Output = Result<Vec<JobRecord>, RepositoryError>> + Send;

    fn remove(&self, job_id: JobId) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
