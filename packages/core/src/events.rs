//! Event types emitted by the dead job monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Events broadcast to observers of the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A running job went quiet and was marked dead.
    JobDeclaredDead {
        job_id: JobId,
        job_type: String,
        stopped_at: DateTime<Utc>,
    },
    /// A sweep ran to completion.
    SweepCompleted {
        candidates: usize,
        stopped: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
    /// A sweep could not enumerate candidates.
    SweepFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MonitorEvent::JobDeclaredDead { stopped_at, .. } => *stopped_at,
            MonitorEvent::SweepCompleted { timestamp, .. } => *timestamp,
            MonitorEvent::SweepFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            MonitorEvent::JobDeclaredDead { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::JobDeclaredDead {
                job_id, job_type, ..
            } => format!("Job {} ({}) declared dead", job_id, job_type),
            MonitorEvent::SweepCompleted {
                candidates,
                stopped,
                failed,
                ..
            } => format!(
                "Sweep completed: {} candidates, {} stopped, {} failed",
                candidates, stopped, failed
            ),
            MonitorEvent::SweepFailed { error, .. } => format!("Sweep failed: {}", error),
        }
    }
}
