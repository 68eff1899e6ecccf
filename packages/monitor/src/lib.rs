//! Dead job monitor.
//!
//! Finds running jobs that stopped sending updates, marks them dead and
//! releases the mutex held by their job type.
//!
//! # Architecture
//!
//! - `StopDeadJobs` - The detector; one `sweep()` per invocation
//! - `JobMutexHandler` - Exclusivity tracker the detector releases locks on
//! - `CleanupActor` - Ractor actor calling `sweep()` on a fixed interval
//!
//! # Usage
//!
//! ```ignore
//! use monitor::{MonitorConfig, StopDeadJobs, InMemJobMutexHandler, start_cleanup_actor};
//!
//! let config = MonitorConfig::from_env()?;
//! let detector = Arc::new(StopDeadJobs::new(repo, mutex, Arc::new(SystemClock), &config));
//! let (cleanup, handle) = start_cleanup_actor(detector, config.sweep_interval()).await?;
//! ```

mod cleanup_actor;
mod config;
mod dead_jobs;
mod messages;
mod mutex;

pub use cleanup_actor::{CleanupActor, CleanupActorState, CleanupArgs, start_cleanup_actor};
pub use config::{ConfigError, MonitorConfig};
pub use dead_jobs::{
    DEAD_JOB_MESSAGE, DeadJob, JobFailure, StopDeadJobs, StopJobError, SweepError, SweepOutcome,
    SweepReport,
};
pub use messages::CleanupMessage;
pub use mutex::{InMemJobMutexHandler, JobMutexHandler, MutexError};

/// Re-export ractor types for convenience.
pub use ractor::{ActorRef, RpcReplyPort, concurrency};
