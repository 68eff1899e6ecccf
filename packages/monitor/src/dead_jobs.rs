//! Detection of running jobs that stopped reporting progress.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::{JobRepository, RepositoryError};
use futures_util::StreamExt;
use futures_util::stream;
use jobs_core::{Clock, JobId, JobMessage, JobRecord, Level};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::mutex::{JobMutexHandler, MutexError};

/// Message appended to every job declared dead.
pub const DEAD_JOB_MESSAGE: &str = "Job didn't receive updates for a while, considering it dead";

/// A sweep that could not run at all.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Failed to query stale jobs: {0}")]
    Query(#[source] RepositoryError),
}

/// A step of a single job's transition that failed.
#[derive(Debug, Error)]
pub enum StopJobError {
    #[error("Failed to mark job dead: {0}")]
    Update(#[source] RepositoryError),
    #[error("Failed to append dead job message: {0}")]
    AppendMessage(#[source] RepositoryError),
    #[error("Failed to release job mutex: {0}")]
    ReleaseLock(#[source] MutexError),
}

/// A job that was moved to the dead state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadJob {
    pub job_id: JobId,
    pub job_type: String,
    pub stopped_at: DateTime<Utc>,
}

/// A failed step while handling one stale job.
#[derive(Debug)]
pub struct JobFailure {
    pub job_id: JobId,
    pub job_type: String,
    pub error: StopJobError,
}

/// What one sweep did.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Stale jobs returned by the registry.
    pub candidates: usize,
    /// Jobs now stored as dead.
    pub stopped: Vec<DeadJob>,
    /// Steps that failed. A job can be both stopped and listed here when only
    /// its message or mutex release failed.
    pub failed: Vec<JobFailure>,
}

#[derive(Debug)]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another sweep on the same detector was still in progress.
    AlreadyRunning,
}

impl SweepOutcome {
    /// The report, if the sweep actually ran.
    pub fn report(&self) -> Option<&SweepReport> {
        match self {
            SweepOutcome::Completed(report) => Some(report),
            SweepOutcome::AlreadyRunning => None,
        }
    }
}

/// Outcome of handling one stale job.
struct JobOutcome {
    stopped: Option<DeadJob>,
    failures: Vec<JobFailure>,
}

/// Marks running jobs as dead once they stop sending updates.
///
/// Each sweep asks the repository for running jobs not updated within the
/// configured threshold, stores each of them as dead, appends a warning to
/// its log and releases the mutex held by its job type. Jobs are handled
/// independently: a failure on one never stops the others.
///
/// The repository query is the only thing preventing a job from being
/// stopped twice. Once a job is dead it no longer matches the query.
pub struct StopDeadJobs<R, M> {
    repository: Arc<R>,
    mutex_handler: Arc<M>,
    clock: Arc<dyn Clock>,
    stop_job_after: chrono::Duration,
    concurrency: usize,
    sweep_guard: Mutex<()>,
}

impl<R, M> StopDeadJobs<R, M>
where
    R: JobRepository,
    M: JobMutexHandler,
{
    pub fn new(
        repository: Arc<R>,
        mutex_handler: Arc<M>,
        clock: Arc<dyn Clock>,
        config: &MonitorConfig,
    ) -> Self {
        info!(
            "Mark old jobs as dead after '{}' seconds of inactivity",
            config.stop_job_after_seconds
        );
        Self {
            repository,
            mutex_handler,
            clock,
            stop_job_after: config.stop_job_after(),
            concurrency: config.sweep_concurrency.max(1),
            sweep_guard: Mutex::new(()),
        }
    }

    /// Oldest `last_updated` a running job may have without being considered dead.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_sub_signed(self.stop_job_after)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Run one sweep.
    ///
    /// Returns [`SweepOutcome::AlreadyRunning`] without doing anything if a
    /// sweep on this detector has not finished yet.
    pub async fn sweep(&self) -> Result<SweepOutcome, SweepError> {
        let Ok(_guard) = self.sweep_guard.try_lock() else {
            debug!("Dead job sweep already in progress, skipping");
            return Ok(SweepOutcome::AlreadyRunning);
        };

        let cutoff = self.cutoff();
        info!(%cutoff, "JobCleanup: Looking for running jobs not updated since cutoff");

        let candidates = self
            .repository
            .find_running_without_update_since(cutoff)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to query stale jobs");
                SweepError::Query(e)
            })?;

        let mut report = SweepReport {
            candidates: candidates.len(),
            ..Default::default()
        };
        if candidates.is_empty() {
            return Ok(SweepOutcome::Completed(report));
        }

        let pending: Vec<_> = candidates.into_iter().map(|job| self.stop_job(job)).collect();
        let outcomes: Vec<JobOutcome> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            report.stopped.extend(outcome.stopped);
            report.failed.extend(outcome.failures);
        }

        info!(
            candidates = report.candidates,
            stopped = report.stopped.len(),
            failed = report.failed.len(),
            "JobCleanup: Sweep finished"
        );

        Ok(SweepOutcome::Completed(report))
    }

    async fn stop_job(&self, job: JobRecord) -> JobOutcome {
        let stopped_at = job.clock.now();
        let fail = |error: StopJobError| {
            error!(job_id = %job.job_id, job_type = %job.job_type, error = %error, "Failed to stop dead job");
            JobFailure {
                job_id: job.job_id,
                job_type: job.job_type.clone(),
                error,
            }
        };

        if let Err(e) = self.repository.create_or_update(job.marked_dead(stopped_at)).await {
            // Still running in storage and still holding its mutex; the next sweep retries.
            return JobOutcome {
                stopped: None,
                failures: vec![fail(StopJobError::Update(e))],
            };
        }

        warn!(
            job_id = %job.job_id,
            job_type = %job.job_type,
            last_updated = %job.last_updated,
            "Job didn't receive updates for a while, marked dead"
        );

        let mut failures = Vec::new();

        let message = JobMessage::new(Level::Warning, DEAD_JOB_MESSAGE, stopped_at);
        if let Err(e) = self.repository.append_message(job.job_id, message).await {
            failures.push(fail(StopJobError::AppendMessage(e)));
        }

        // Released by type: whichever job of this type holds the mutex loses it.
        // Also released when the append hit NotFound, so the lock never leaks.
        if let Err(e) = self.mutex_handler.job_has_stopped(&job.job_type).await {
            failures.push(fail(StopJobError::ReleaseLock(e)));
        }

        JobOutcome {
            stopped: Some(DeadJob {
                job_id: job.job_id,
                job_type: job.job_type.clone(),
                stopped_at,
            }),
            failures,
        }
    }
}
