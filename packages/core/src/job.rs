//! Job records tracked by the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::clock::{Clock, JobClock};

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current status of a job in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is executing and expected to send updates.
    #[default]
    Running,
    /// Job finished normally.
    Ok,
    /// Job finished with an error.
    Error,
    /// Job was skipped, e.g. because its mutex was held.
    Skipped,
    /// Job stopped sending updates and was given up on.
    Dead,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Ok => "ok",
            JobStatus::Error => "error",
            JobStatus::Skipped => "skipped",
            JobStatus::Dead => "dead",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a job message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// An entry in a job's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub level: Level,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl JobMessage {
    pub fn new(level: Level, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
        }
    }
}

/// A unit of tracked work.
///
/// Records are replaced whole on every status transition; build the new
/// version with [`JobRecord::marked_dead`] or [`JobRecord::stopped_with`]
/// instead of mutating a record that someone else may be reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier for this job.
    pub job_id: JobId,
    /// Class of job; jobs of one type are mutually exclusive.
    pub job_type: String,
    /// Current status.
    pub status: JobStatus,
    /// When the job started.
    pub started: DateTime<Utc>,
    /// When the job last reported progress.
    pub last_updated: DateTime<Utc>,
    /// When the job reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped: Option<DateTime<Utc>>,
    /// Host the job runs on.
    #[serde(default)]
    pub hostname: String,
    /// Append-only message log.
    #[serde(default)]
    pub messages: Vec<JobMessage>,
    /// Clock used to stamp this job's own transitions.
    #[serde(skip)]
    pub clock: JobClock,
}

impl JobRecord {
    /// Create a job that has just started running.
    pub fn running(job_type: impl Into<String>, hostname: impl Into<String>, clock: JobClock) -> Self {
        let now = clock.now();
        Self {
            job_id: JobId::new(),
            job_type: job_type.into(),
            status: JobStatus::Running,
            started: now,
            last_updated: now,
            stopped: None,
            hostname: hostname.into(),
            messages: Vec::new(),
            clock,
        }
    }

    /// Set the time of the last progress update.
    pub fn with_last_updated(mut self, last_updated: DateTime<Utc>) -> Self {
        self.last_updated = last_updated;
        self
    }

    /// Replace the clock used for this job's transitions.
    pub fn with_clock(mut self, clock: JobClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// A copy of this record moved into `status`, stamped `at`.
    pub fn stopped_with(&self, status: JobStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            stopped: Some(at),
            last_updated: at,
            ..self.clone()
        }
    }

    /// A copy of this record declared dead at `at`.
    pub fn marked_dead(&self, at: DateTime<Utc>) -> Self {
        self.stopped_with(JobStatus::Dead, at)
    }
}
