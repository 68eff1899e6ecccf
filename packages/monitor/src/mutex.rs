//! Exclusivity tracking per job type.

use std::collections::HashSet;
use std::future::Future;

use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from an exclusivity tracker.
#[derive(Debug, Error)]
pub enum MutexError {
    #[error("Mutex handler unavailable: {0}")]
    Unavailable(String),
}

/// Tracks which job types currently have an active job.
pub trait JobMutexHandler: Send + Sync {
    /// Try to mark `job_type` as active. Returns `false` if the type, or any
    /// type sharing a mutex group with it, is already active.
    fn job_has_started(&self, job_type: &str) -> impl Future<Output = Result<bool, MutexError>> + Send;

    /// Release the lock held for `job_type`. Releasing a type that holds no
    /// lock is a no-op.
    fn job_has_stopped(&self, job_type: &str) -> impl Future<Output = Result<(), MutexError>> + Send;
}

/// Process-local exclusivity tracker.
///
/// Job types listed together in a mutex group exclude each other; every
/// other type only excludes itself.
#[derive(Debug, Default)]
pub struct InMemJobMutexHandler {
    mutex_groups: Vec<HashSet<String>>,
    active: RwLock<HashSet<String>>,
}

impl InMemJobMutexHandler {
    /// Create a tracker without mutex groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group of job types that must never run at the same time.
    pub fn with_mutex_group<I, S>(mut self, job_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mutex_groups
            .push(job_types.into_iter().map(Into::into).collect());
        self
    }

    /// Check if `job_type` currently holds a lock.
    pub async fn is_active(&self, job_type: &str) -> bool {
        self.active.read().await.contains(job_type)
    }

    /// All job types that conflict with `job_type`, itself included.
    fn conflicting<'a>(&'a self, job_type: &'a str) -> impl Iterator<Item = &'a str> {
        self.mutex_groups
            .iter()
            .filter(move |group| group.contains(job_type))
            .flat_map(|group| group.iter().map(String::as_str))
            .chain(std::iter::once(job_type))
    }
}

impl JobMutexHandler for InMemJobMutexHandler {
    async fn job_has_started(&self, job_type: &str) -> Result<bool, MutexError> {
        let mut active = self.active.write().await;
        if self.conflicting(job_type).any(|t| active.contains(t)) {
            tracing::debug!(job_type, "Job type blocked by a running job");
            return Ok(false);
        }
        active.insert(job_type.to_string());
        Ok(true)
    }

    async fn job_has_stopped(&self, job_type: &str) -> Result<(), MutexError> {
        self.active.write().await.remove(job_type);
        Ok(())
    }
}
