#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use db::{InMemJobRepository, JobRepository, RepositoryError};
use jobs_core::{Clock, FixedClock, JobClock, JobId, JobMessage, JobRecord, JobStatus};
use monitor::{InMemJobMutexHandler, JobMutexHandler, MonitorConfig, MutexError, StopDeadJobs};
use tokio::sync::Notify;

pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
}

/// A running job whose own clock is pinned to `clock_time`.
pub fn running_job(job_type: &str, last_updated: DateTime<Utc>, clock_time: DateTime<Utc>) -> JobRecord {
    let mut job = JobRecord::running(job_type, "host-1", JobClock::new(FixedClock(clock_time)))
        .with_last_updated(last_updated);
    job.started = last_updated;
    job
}

/// In-memory repository that counts writes and can be told to fail.
#[derive(Default)]
pub struct TestRepository {
    pub inner: InMemJobRepository,
    pub updates: AtomicUsize,
    pub appends: AtomicUsize,
    pub fail_query: AtomicBool,
    pub fail_update_for: Mutex<HashSet<JobId>>,
    pub fail_append_for: Mutex<HashSet<JobId>>,
    /// Jobs that finish normally after the stale query has returned them.
    pub finish_before_update: Mutex<HashSet<JobId>>,
    /// When set, the stale query signals `entered` and waits for `release`.
    pub hold_query: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl TestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding_query(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            hold_query: Some((entered, release)),
            ..Self::default()
        }
    }

    pub async fn seed(&self, jobs: &[JobRecord]) {
        for job in jobs {
            self.inner.create_or_update(job.clone()).await.unwrap();
        }
    }

    pub async fn get(&self, job_id: JobId) -> JobRecord {
        self.inner.find_one(job_id).await.unwrap().expect("job stored")
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

impl JobRepository for TestRepository {
    async fn find_running_without_update_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        if let Some((entered, release)) = &self.hold_query {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("query timed out".into()));
        }
        self.inner.find_running_without_update_since(cutoff).await
    }

    async fn create_or_update(&self, record: JobRecord) -> Result<(), RepositoryError> {
        if self.fail_update_for.lock().unwrap().contains(&record.job_id) {
            return Err(RepositoryError::Storage("disk full".into()));
        }
        let finishes = self.finish_before_update.lock().unwrap().remove(&record.job_id);
        if finishes {
            let current = self.get(record.job_id).await;
            let finished = current.stopped_with(JobStatus::Ok, current.clock.now());
            self.inner.create_or_update(finished).await?;
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_or_update(record).await
    }

    async fn append_message(&self, job_id: JobId, message: JobMessage) -> Result<(), RepositoryError> {
        if self.fail_append_for.lock().unwrap().contains(&job_id) {
            return Err(RepositoryError::NotFound(job_id));
        }
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append_message(job_id, message).await
    }

    async fn find_one(&self, job_id: JobId) -> Result<Option<JobRecord>, RepositoryError> {
        self.inner.find_one(job_id).await
    }

    async fn find_all(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        self.inner.find_all().await
    }

    async fn remove(&self, job_id: JobId) -> Result<(), RepositoryError> {
        self.inner.remove(job_id).await
    }
}

/// Mutex handler that records every release.
#[derive(Default)]
pub struct TestMutexHandler {
    pub inner: InMemJobMutexHandler,
    pub released: Mutex<Vec<String>>,
    pub fail_for: Mutex<HashSet<String>>,
}

impl TestMutexHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

impl JobMutexHandler for TestMutexHandler {
    async fn job_has_started(&self, job_type: &str) -> Result<bool, MutexError> {
        self.inner.job_has_started(job_type).await
    }

    async fn job_has_stopped(&self, job_type: &str) -> Result<(), MutexError> {
        if self.fail_for.lock().unwrap().contains(job_type) {
            return Err(MutexError::Unavailable("lock service down".into()));
        }
        self.released.lock().unwrap().push(job_type.to_string());
        self.inner.job_has_stopped(job_type).await
    }
}

pub struct Fixture {
    pub repo: Arc<TestRepository>,
    pub mutex: Arc<TestMutexHandler>,
    pub detector: Arc<StopDeadJobs<TestRepository, TestMutexHandler>>,
}

pub fn fixture(repo: TestRepository, monitor_time: DateTime<Utc>, config: MonitorConfig) -> Fixture {
    let repo = Arc::new(repo);
    let mutex = Arc::new(TestMutexHandler::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(monitor_time));
    let detector = Arc::new(StopDeadJobs::new(repo.clone(), mutex.clone(), clock, &config));
    Fixture {
        repo,
        mutex,
        detector,
    }
}
